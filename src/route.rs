//! Route construction: one file in, one immutable `Route` out.
//!
//! A route bundles everything a request for its path will ever need: the
//! plain body, the precompressed variants, and the precomputed header
//! values. Nothing about a route mutates after construction; the dev
//! refresher replaces whole routes instead of editing them.

use crate::compress::{self, Encoding, Levels, MIN_COMPRESS_SIZE};
use crate::template::TemplateContext;
use crate::utils::{date::DateTimeUtc, hash::StableHasher};
use crate::{debug, log, mime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// The body variants of one route.
///
/// `plain` is authoritative (post-templating); the compressed buffers are
/// present only for compressible MIME types and each decompresses back to
/// `plain` exactly. Every buffer is independently shareable by reference.
#[derive(Debug, Clone)]
pub struct Content {
    pub plain: Arc<[u8]>,
    pub gzip: Option<Arc<[u8]>>,
    pub brotli: Option<Arc<[u8]>>,
    pub zstd: Option<Arc<[u8]>>,
}

impl Content {
    /// The buffer for a coding, if this route carries it.
    pub fn variant(&self, encoding: Encoding) -> Option<&Arc<[u8]>> {
        match encoding {
            Encoding::Identity => Some(&self.plain),
            Encoding::Gzip => self.gzip.as_ref(),
            Encoding::Brotli => self.brotli.as_ref(),
            Encoding::Zstd => self.zstd.as_ref(),
        }
    }
}

/// Precomputed header values for one route.
///
/// Computed once at build time; the dispatcher attaches them without any
/// per-request formatting.
#[derive(Debug, Clone)]
pub struct Headers {
    pub content_type: &'static str,
    pub etag: Box<str>,
    pub last_modified: Box<str>,
    pub cache_control: &'static str,
}

/// An immutable bundle of content variants and headers for one URL path.
#[derive(Debug)]
pub struct Route {
    /// Filesystem path the route was built from (dev refresh re-reads it)
    pub source: PathBuf,
    /// File mtime at build time
    pub mtime: SystemTime,
    pub content: Content,
    pub headers: Headers,
}

/// Build a route from a file's bytes.
///
/// Applies the file-type policy: HTML is templated (falling back to the
/// raw bytes if rendering fails), compressible types get gzip/brotli/zstd
/// variants, and headers are precomputed from the MIME type and mtime.
/// Safe to call concurrently for different files.
pub fn build(
    source: &Path,
    bytes: Vec<u8>,
    mtime: SystemTime,
    templates: &TemplateContext,
    levels: Levels,
) -> Route {
    let mime = mime::from_path(source);
    let name = source.display().to_string();

    let plain = if mime::is_templateable(mime) {
        match templates.render(&name, &bytes) {
            Ok(rendered) => rendered,
            Err(e) => {
                log!("error"; "{e:#}; serving untemplated content");
                bytes
            }
        }
    } else {
        bytes
    };

    let (gzip, brotli, zstd) = if mime::is_compressible(mime) && plain.len() >= MIN_COMPRESS_SIZE {
        compress::compress_all(&name, &plain, levels)
    } else {
        debug!("routes"; "{name}: skipping compression ({mime}, {} bytes)", plain.len());
        (None, None, None)
    };

    Route {
        source: source.to_path_buf(),
        mtime,
        content: Content {
            plain: plain.into(),
            gzip: gzip.map(Into::into),
            brotli: brotli.map(Into::into),
            zstd: zstd.map(Into::into),
        },
        headers: Headers {
            content_type: mime,
            etag: strong_etag(source, mtime).into(),
            last_modified: DateTimeUtc::from_system_time(mtime).to_rfc2822().into(),
            cache_control: mime::cache_control(mime),
        },
    }
}

/// Strong ETag: quoted 32-hex-character blake3 digest of (path, mtime).
///
/// Deterministic across restarts for unchanged files, so clients keep
/// their cache hits through a redeploy.
fn strong_etag(source: &Path, mtime: SystemTime) -> String {
    let nanos = mtime
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let digest = StableHasher::new()
        .update_str(&source.to_string_lossy())
        .update_u128(nanos)
        .finish_hex();
    format!("\"{}\"", &digest[..32])
}
