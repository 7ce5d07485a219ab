//! Startup templating of HTML assets.
//!
//! SPA builds bake their API endpoints in at bundle time; this module lets a
//! prebuilt bundle take them from the server's environment instead. At
//! startup every environment variable carrying the configured prefix
//! (default `VITE_`) is captured, prefix-stripped, and exposed to `{{ … }}`
//! interpolation in HTML files:
//!
//! - `{{env.API_URL}}` — a single variable
//! - `{{Json}}` — the whole mapping as a JSON object literal
//! - `{{EscapedJson}}` — the same JSON escaped for use inside a
//!   double-quoted string literal
//!
//! Rendering happens once per file at route build time, never per request.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde_json::json;
use std::collections::BTreeMap;

/// Environment snapshot exposed to templates.
///
/// Captured once at startup; read-only for the process lifetime. The
/// ordered map keeps the `Json` aggregate deterministic across runs.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    data: serde_json::Value,
}

impl TemplateContext {
    /// Snapshot the current process environment, keeping variables that
    /// start with `prefix` and stripping the prefix from their names.
    pub fn from_env(prefix: &str) -> Self {
        let vars = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect();
        Self::from_vars(vars)
    }

    /// Build a context from an explicit variable mapping.
    pub fn from_vars(vars: BTreeMap<String, String>) -> Self {
        // BTreeMap iteration order makes this serialization deterministic
        let json = serde_json::to_string(&vars).unwrap_or_else(|_| String::from("{}"));
        let escaped_json = json.replace('"', "\\\"");

        Self {
            data: json!({
                "env": vars,
                "Json": json,
                "EscapedJson": escaped_json,
            }),
        }
    }

    /// Render `{{ … }}` interpolation over `source`.
    ///
    /// `name` is only used in error messages. Identical inputs always
    /// produce identical output; unknown variables render as empty.
    pub fn render(&self, name: &str, source: &[u8]) -> Result<Vec<u8>> {
        let source =
            str::from_utf8(source).with_context(|| format!("{name}: template is not UTF-8"))?;

        let mut registry = Handlebars::new();
        // Values are substituted into HTML the author controls; entity
        // escaping would corrupt the Json aggregate.
        registry.register_escape_fn(handlebars::no_escape);

        let rendered = registry
            .render_template(source, &self.data)
            .with_context(|| format!("{name}: template rendering failed"))?;
        Ok(rendered.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> TemplateContext {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TemplateContext::from_vars(vars)
    }

    #[test]
    fn test_env_interpolation() {
        let ctx = ctx(&[("SITE", "Hello")]);
        let out = ctx.render("index.html", b"<p>{{env.SITE}}</p>").unwrap();
        assert_eq!(out, b"<p>Hello</p>");
    }

    #[test]
    fn test_json_aggregate() {
        let ctx = ctx(&[("A", "1"), ("B", "2")]);
        let out = ctx.render("t", b"window.config = {{Json}};").unwrap();
        assert_eq!(out, br#"window.config = {"A":"1","B":"2"};"#);
    }

    #[test]
    fn test_escaped_json_aggregate() {
        let ctx = ctx(&[("A", "1")]);
        let out = ctx.render("t", br#"var raw = "{{EscapedJson}}";"#).unwrap();
        assert_eq!(out, br#"var raw = "{\"A\":\"1\"}";"#);
    }

    #[test]
    fn test_values_not_html_escaped() {
        let ctx = ctx(&[("TAG", "<b>&amp;</b>")]);
        let out = ctx.render("t", b"{{env.TAG}}").unwrap();
        assert_eq!(out, b"<b>&amp;</b>");
    }

    #[test]
    fn test_unknown_variable_renders_empty() {
        let ctx = ctx(&[]);
        let out = ctx.render("t", b"[{{env.MISSING}}]").unwrap();
        assert_eq!(out, b"[]");
    }

    #[test]
    fn test_deterministic() {
        let ctx = ctx(&[("X", "y"), ("A", "b")]);
        let a = ctx.render("t", b"{{Json}}").unwrap();
        let b = ctx.render("t", b"{{Json}}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_failure_is_error() {
        let ctx = ctx(&[]);
        assert!(ctx.render("t", b"{{#if}}").is_err());
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let ctx = ctx(&[]);
        assert!(ctx.render("t", &[0xff, 0xfe, b'{', b'{']).is_err());
    }

    #[test]
    fn test_from_env_strips_prefix() {
        // SAFETY: test-local variable name, no concurrent reader cares
        unsafe {
            std::env::set_var("DARTER_TEST_SITE", "ok");
        }
        let ctx = TemplateContext::from_env("DARTER_TEST_");
        let out = ctx.render("t", b"{{env.SITE}}").unwrap();
        assert_eq!(out, b"ok");
        unsafe {
            std::env::remove_var("DARTER_TEST_SITE");
        }
    }
}
