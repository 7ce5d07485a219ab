//! File-type policy: MIME detection and the per-type serving rules.
//!
//! Every policy decision the server makes about a file derives from its MIME
//! type, which in turn derives from the final extension of the file name.
//! Three predicates hang off the MIME string:
//!
//! - [`is_templateable`]: does the route builder run the file through the
//!   template engine? (HTML only)
//! - [`is_compressible`]: is the payload worth precompressing, or is it an
//!   already-compressed/opaque binary?
//! - [`AssetClass`]: which `Cache-Control` directive the file gets.
//!
//! All lookups return `&'static str` values so the dispatch path never
//! allocates for header material.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "text/javascript";
    pub const JSON: &str = "application/json";
    pub const JSON_LD: &str = "application/ld+json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown";
    pub const CSV: &str = "text/csv";
    pub const CACHE_MANIFEST: &str = "text/cache-manifest";

    // Web feeds / manifests
    pub const RSS: &str = "application/rss+xml";
    pub const ATOM: &str = "application/atom+xml";
    pub const WEB_MANIFEST: &str = "application/manifest+json";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";
    pub const PDF: &str = "application/pdf";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";
    pub const BMP: &str = "image/bmp";
    pub const TIFF: &str = "image/tiff";
    pub const HEIC: &str = "image/heic";
    pub const HEIF: &str = "image/heif";

    // Audio
    pub const MP3: &str = "audio/mpeg";
    pub const WAV: &str = "audio/wav";
    pub const OGG_AUDIO: &str = "audio/ogg";
    pub const FLAC: &str = "audio/flac";
    pub const AAC: &str = "audio/aac";
    pub const M4A: &str = "audio/mp4";
    pub const OPUS: &str = "audio/opus";

    // Video
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";
    pub const AVI: &str = "video/x-msvideo";
    pub const MOV: &str = "video/quicktime";
    pub const WMV: &str = "video/x-ms-wmv";
    pub const FLV: &str = "video/x-flv";
    pub const MKV: &str = "video/x-matroska";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";

    // Archives
    pub const ZIP: &str = "application/zip";
    pub const TAR: &str = "application/x-tar";
    pub const GZIP: &str = "application/gzip";
    pub const BZIP2: &str = "application/x-bzip2";
    pub const RAR: &str = "application/vnd.rar";
    pub const SEVEN_Z: &str = "application/x-7z-compressed";
    pub const XZ: &str = "application/x-xz";

    // Documents
    pub const DOC: &str = "application/msword";
    pub const DOCX: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const XLS: &str = "application/vnd.ms-excel";
    pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    pub const PPT: &str = "application/vnd.ms-powerpoint";
    pub const PPTX: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation";
    pub const RTF: &str = "application/rtf";
}

/// Guess MIME type from a file path's final extension.
///
/// Unknown and missing extensions resolve to `application/octet-stream`.
/// The lookup runs on the file name, so a dotfile like `.htaccess` is
/// treated as having the extension `.htaccess` (unmapped, hence default).
pub fn from_path(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(idx) => from_extension(&name[idx..].to_ascii_lowercase()),
        None => types::OCTET_STREAM,
    }
}

/// Guess MIME type from a lowercase extension including the leading dot.
pub fn from_extension(ext: &str) -> &'static str {
    match ext {
        // Web / text
        ".html" | ".htm" => types::HTML,
        ".css" | ".scss" | ".sass" | ".less" => types::CSS,
        ".js" | ".mjs" | ".cjs" | ".jsx" => types::JAVASCRIPT,
        ".json" | ".map" => types::JSON,
        ".jsonld" => types::JSON_LD,
        ".xml" | ".xsl" | ".xslt" => types::XML,
        ".md" | ".markdown" => types::MARKDOWN,
        ".csv" => types::CSV,
        ".txt" | ".text" | ".log" | ".ini" | ".cfg" | ".conf" | ".env" | ".yaml" | ".yml"
        | ".toml" | ".ts" | ".tsx" | ".sh" | ".py" | ".rb" | ".go" | ".rs" | ".c" | ".h"
        | ".cpp" | ".java" | ".sql" | ".lock" => types::PLAIN,
        ".appcache" => types::CACHE_MANIFEST,

        // Feeds / manifests
        ".rss" => types::RSS,
        ".atom" => types::ATOM,
        ".manifest" | ".webmanifest" => types::WEB_MANIFEST,

        // Images
        ".svg" => types::SVG,
        ".png" => types::PNG,
        ".jpg" | ".jpeg" => types::JPEG,
        ".gif" => types::GIF,
        ".webp" => types::WEBP,
        ".avif" => types::AVIF,
        ".ico" => types::ICO,
        ".bmp" => types::BMP,
        ".tif" | ".tiff" => types::TIFF,
        ".heic" => types::HEIC,
        ".heif" => types::HEIF,

        // Audio
        ".mp3" => types::MP3,
        ".wav" => types::WAV,
        ".ogg" | ".oga" => types::OGG_AUDIO,
        ".flac" => types::FLAC,
        ".aac" => types::AAC,
        ".m4a" => types::M4A,
        ".opus" => types::OPUS,

        // Video
        ".mp4" | ".m4v" => types::MP4,
        ".webm" => types::WEBM,
        ".avi" => types::AVI,
        ".mov" => types::MOV,
        ".wmv" => types::WMV,
        ".flv" => types::FLV,
        ".mkv" => types::MKV,

        // Fonts
        ".woff" => types::WOFF,
        ".woff2" => types::WOFF2,
        ".ttf" => types::TTF,
        ".otf" => types::OTF,
        ".eot" => types::EOT,

        // Archives
        ".zip" => types::ZIP,
        ".tar" => types::TAR,
        ".gz" => types::GZIP,
        ".bz2" => types::BZIP2,
        ".rar" => types::RAR,
        ".7z" => types::SEVEN_Z,
        ".xz" => types::XZ,

        // Documents
        ".pdf" => types::PDF,
        ".doc" => types::DOC,
        ".docx" => types::DOCX,
        ".xls" => types::XLS,
        ".xlsx" => types::XLSX,
        ".ppt" => types::PPT,
        ".pptx" => types::PPTX,
        ".rtf" => types::RTF,

        // Other binary
        ".wasm" => types::WASM,
        _ => types::OCTET_STREAM,
    }
}

/// Whether the route builder runs this MIME type through the template engine.
pub fn is_templateable(mime: &str) -> bool {
    mime == types::HTML
}

/// Whether precompressed variants are worth storing for this MIME type.
///
/// Textual and structured formats compress well; images (except SVG),
/// audio, video, fonts, and archives are already compressed or opaque.
pub fn is_compressible(mime: &str) -> bool {
    matches!(
        mime,
        "text/html"
            | "text/css"
            | "text/javascript"
            | "text/plain"
            | "text/csv"
            | "text/markdown"
            | "text/cache-manifest"
            | "application/json"
            | "application/ld+json"
            | "application/manifest+json"
            | "text/xml"
            | "application/xml"
            | "application/rss+xml"
            | "application/atom+xml"
            | "image/svg+xml"
    )
}

/// Cache-control classification for a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    /// Fingerprinted build assets: images, fonts, media, css, js
    LongCache,
    /// HTML documents, revalidated frequently
    Html,
    /// Everything else
    Other,
}

impl AssetClass {
    pub fn of(mime: &str) -> Self {
        match mime {
            "text/css" | "text/javascript" | types::EOT => Self::LongCache,
            types::HTML => Self::Html,
            m if m.starts_with("image/")
                || m.starts_with("font/")
                || m.starts_with("audio/")
                || m.starts_with("video/") =>
            {
                Self::LongCache
            }
            _ => Self::Other,
        }
    }

    /// The precomputed `Cache-Control` directive for this class.
    pub fn cache_control(self) -> &'static str {
        match self {
            Self::LongCache => "public, max-age=31536000, immutable",
            Self::Html => "public, max-age=900",
            Self::Other => "public, max-age=3600",
        }
    }
}

/// Shorthand: `Cache-Control` value for a MIME type.
pub fn cache_control(mime: &str) -> &'static str {
    AssetClass::of(mime).cache_control()
}
