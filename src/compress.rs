//! Precompression of route bodies.
//!
//! Compressible routes carry gzip, brotli, and zstd variants computed once
//! at build time so the dispatcher only ever hands out finished buffers.
//! The three encoders are independent and run on the rayon pool; route
//! builds for different files already fan out in parallel, so a single
//! file's variants nest inside that parallelism with `rayon::join`.

use crate::{debug, log};
use anyhow::Result;
use flate2::{Compression, write::GzEncoder};
use std::io::Write;

/// Bodies smaller than this are not worth a compressed variant; the
/// header overhead eats the savings.
pub const MIN_COMPRESS_SIZE: usize = 1024;

/// Content codings the server can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
    Brotli,
    Zstd,
}

impl Encoding {
    /// The coding name as it appears in `Content-Encoding`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Brotli => "br",
            Self::Zstd => "zstd",
        }
    }
}

/// Compression levels, fixed at build time.
///
/// Startup pays for compression exactly once per file, so the defaults
/// lean toward smaller output rather than faster builds.
#[derive(Debug, Clone, Copy)]
pub struct Levels {
    pub gzip: u32,
    pub brotli: u32,
    pub zstd: i32,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            gzip: 6,
            brotli: 6,
            zstd: 3,
        }
    }
}

/// All three compressed variants of one buffer, produced in parallel.
///
/// A variant is omitted when its encoder fails (logged, the route still
/// serves `plain`) or when it fails to beat the input size.
pub fn compress_all(
    name: &str,
    plain: &[u8],
    levels: Levels,
) -> (Option<Vec<u8>>, Option<Vec<u8>>, Option<Vec<u8>>) {
    let (gzip, (brotli, zstd)) = rayon::join(
        || variant(name, "gzip", plain, gzip_compress(plain, levels.gzip)),
        || {
            rayon::join(
                || variant(name, "br", plain, brotli_compress(plain, levels.brotli)),
                || variant(name, "zstd", plain, zstd_compress(plain, levels.zstd)),
            )
        },
    );
    (gzip, brotli, zstd)
}

/// Unwrap one encoder result, dropping failures and unprofitable output.
fn variant(name: &str, coding: &str, plain: &[u8], result: Result<Vec<u8>>) -> Option<Vec<u8>> {
    match result {
        Ok(out) if out.len() < plain.len() => Some(out),
        Ok(out) => {
            debug!("routes"; "{name}: {coding} variant not smaller ({} >= {}), dropped", out.len(), plain.len());
            None
        }
        Err(e) => {
            log!("error"; "{name}: {coding} compression failed: {e}");
            None
        }
    }
}

pub fn gzip_compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub fn brotli_compress(data: &[u8], quality: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, quality, 22);
        writer.write_all(data)?;
        writer.flush()?;
    }
    Ok(out)
}

pub fn zstd_compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    Ok(zstd::bulk::compress(data, level)?)
}
