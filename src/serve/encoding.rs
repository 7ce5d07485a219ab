//! Accept-Encoding parsing and variant selection.
//!
//! The header is a comma-separated list of codings with optional `;q=`
//! quality values. Tokenization is exact: a coding matches only as a whole
//! token name, so `vibrant` never advertises `br`. A coding with `q=0` is
//! explicitly refused by the client.

use crate::compress::Encoding;
use crate::route::Content;

/// Codings the client will accept.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub brotli: bool,
    pub zstd: bool,
    pub gzip: bool,
    pub identity: bool,
}

/// Parse an `Accept-Encoding` header value.
pub fn parse(header: &str) -> Accepted {
    let mut accepted = Accepted::default();
    for token in header.split(',') {
        let mut parts = token.split(';');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() || !eligible(parts) {
            continue;
        }
        match name.to_ascii_lowercase().as_str() {
            "br" => accepted.brotli = true,
            "zstd" => accepted.zstd = true,
            "gzip" => accepted.gzip = true,
            "identity" => accepted.identity = true,
            // Unknown codings (and "*") are ignored
            _ => {}
        }
    }
    accepted
}

/// A coding is eligible unless an explicit `q` value rules it out.
fn eligible<'a>(params: impl Iterator<Item = &'a str>) -> bool {
    for param in params {
        let mut kv = param.splitn(2, '=');
        let key = kv.next().unwrap_or_default().trim();
        if !key.eq_ignore_ascii_case("q") {
            continue;
        }
        let value = kv.next().unwrap_or_default().trim();
        return value.parse::<f32>().map(|q| q > 0.0).unwrap_or(false);
    }
    true
}

/// Choose the variant to serve.
///
/// Fixed priority brotli > zstd > gzip > identity, skipping codings the
/// route has no buffer for. A missing header, or one that advertises no
/// supported coding, selects the plain body.
pub fn negotiate(header: Option<&str>, content: &Content) -> Encoding {
    let Some(header) = header else {
        return Encoding::Identity;
    };
    let accepted = parse(header);

    if accepted.brotli && content.brotli.is_some() {
        Encoding::Brotli
    } else if accepted.zstd && content.zstd.is_some() {
        Encoding::Zstd
    } else if accepted.gzip && content.gzip.is_some() {
        Encoding::Gzip
    } else {
        Encoding::Identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn full_content() -> Content {
        Content {
            plain: Arc::from(&b"plain"[..]),
            gzip: Some(Arc::from(&b"gz"[..])),
            brotli: Some(Arc::from(&b"br"[..])),
            zstd: Some(Arc::from(&b"zs"[..])),
        }
    }

    fn plain_content() -> Content {
        Content {
            plain: Arc::from(&b"plain"[..]),
            gzip: None,
            brotli: None,
            zstd: None,
        }
    }

    #[test]
    fn test_parse_simple_list() {
        let accepted = parse("gzip, br, zstd");
        assert!(accepted.gzip);
        assert!(accepted.brotli);
        assert!(accepted.zstd);
        assert!(!accepted.identity);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let accepted = parse("GZip, BR");
        assert!(accepted.gzip);
        assert!(accepted.brotli);
    }

    #[test]
    fn test_tokens_match_whole_names_only() {
        // "vibrant" must not advertise "br"
        let accepted = parse("vibrant");
        assert_eq!(accepted, Accepted::default());

        let accepted = parse("gzipped, braille");
        assert_eq!(accepted, Accepted::default());
    }

    #[test]
    fn test_quality_zero_refuses_coding() {
        let accepted = parse("gzip;q=0, br;q=0.8");
        assert!(!accepted.gzip);
        assert!(accepted.brotli);

        let accepted = parse("br;q=0.0");
        assert!(!accepted.brotli);
    }

    #[test]
    fn test_quality_with_whitespace() {
        let accepted = parse("br ; q=0.5 , gzip ; q=1");
        assert!(accepted.brotli);
        assert!(accepted.gzip);
    }

    #[test]
    fn test_malformed_quality_refuses_coding() {
        let accepted = parse("gzip;q=abc");
        assert!(!accepted.gzip);
    }

    #[test]
    fn test_priority_order() {
        let content = full_content();
        assert_eq!(
            negotiate(Some("gzip, br, zstd"), &content),
            Encoding::Brotli
        );
        assert_eq!(negotiate(Some("gzip, zstd"), &content), Encoding::Zstd);
        assert_eq!(negotiate(Some("gzip"), &content), Encoding::Gzip);
        assert_eq!(negotiate(Some("identity"), &content), Encoding::Identity);
    }

    #[test]
    fn test_missing_header_selects_identity() {
        assert_eq!(negotiate(None, &full_content()), Encoding::Identity);
    }

    #[test]
    fn test_unsupported_codings_select_identity() {
        let content = full_content();
        assert_eq!(
            negotiate(Some("vibrant, identity;q=1"), &content),
            Encoding::Identity
        );
        assert_eq!(negotiate(Some("deflate"), &content), Encoding::Identity);
    }

    #[test]
    fn test_missing_variants_are_skipped() {
        let content = plain_content();
        assert_eq!(
            negotiate(Some("br, zstd, gzip"), &content),
            Encoding::Identity
        );
    }

    #[test]
    fn test_nothing_eligible_still_serves_plain() {
        let content = full_content();
        assert_eq!(
            negotiate(Some("identity;q=0"), &content),
            Encoding::Identity
        );
    }
}
