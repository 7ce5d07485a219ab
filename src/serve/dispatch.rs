//! Per-request dispatch.
//!
//! Stateless per request: health short-circuit, path validation, cache
//! lookup with directory and SPA fallbacks, conditional-request check,
//! and encoding selection. Every failure is an HTTP status; nothing
//! propagates out. The happy path performs no allocation beyond the
//! `Arc` handoff (and a key clone in dev mode).

use super::ServerState;
use super::encoding;
use super::refresh;
use crate::compress::Encoding;
use crate::route::Route;
use std::borrow::Cow;
use std::sync::Arc;
use tiny_http::Method;

/// What the request resolved to. The response writer turns this into an
/// actual HTTP response without further decisions.
#[derive(Debug)]
pub enum Outcome {
    /// Full response from a cached route
    Serve {
        route: Arc<Route>,
        encoding: Encoding,
        head: bool,
    },
    /// `If-None-Match` matched; caching headers only
    NotModified { route: Arc<Route> },
    /// Health probe, answered without consulting the cache
    Health { head: bool },
    /// Path contained `..` or a NUL byte
    BadRequest,
    NotFound { head: bool },
    MethodNotAllowed,
}

impl Outcome {
    pub fn status(&self) -> u16 {
        match self {
            Self::Serve { .. } | Self::Health { .. } => 200,
            Self::NotModified { .. } => 304,
            Self::BadRequest => 400,
            Self::NotFound { .. } => 404,
            Self::MethodNotAllowed => 405,
        }
    }
}

/// Resolve one request against the route cache.
pub fn dispatch(
    method: &Method,
    path: &str,
    accept_encoding: Option<&str>,
    if_none_match: Option<&str>,
    state: &ServerState,
) -> Outcome {
    let head = match method {
        Method::Get => false,
        Method::Head => true,
        _ => return Outcome::MethodNotAllowed,
    };

    if path == "/_health" || path == "/health" {
        return Outcome::Health { head };
    }

    // The cache can never hold such keys; rejecting explicitly keeps
    // traversal probes out of the lookup path entirely.
    if !is_valid_path(path) {
        return Outcome::BadRequest;
    }

    let Some((key, route)) = resolve(state, path) else {
        return Outcome::NotFound { head };
    };

    let route = if state.config.dev {
        refresh::refresh_if_modified(state, &key, route)
    } else {
        route
    };

    if let Some(tag) = if_none_match
        && tag.as_bytes() == route.headers.etag.as_bytes()
    {
        return Outcome::NotModified { route };
    }

    let encoding = encoding::negotiate(accept_encoding, &route.content);
    Outcome::Serve {
        route,
        encoding,
        head,
    }
}

/// Reject paths with `..` segments or NUL bytes.
fn is_valid_path(path: &str) -> bool {
    !path.contains('\0') && path.split('/').all(|segment| segment != "..")
}

/// Cache lookup with the two fallbacks: directory index (`path + "/"`)
/// and, in SPA mode, the root route. Returns the key the route was found
/// under so a dev refresh replaces the right entry.
fn resolve<'a>(state: &ServerState, path: &'a str) -> Option<(Cow<'a, str>, Arc<Route>)> {
    if let Some(route) = state.cache.lookup(path) {
        return Some((Cow::Borrowed(path), route));
    }

    if !path.ends_with('/') {
        let with_slash = format!("{path}/");
        if let Some(route) = state.cache.lookup(&with_slash) {
            return Some((Cow::Owned(with_slash), route));
        }
    }

    if state.config.spa {
        if let Some(route) = state.cache.lookup("/") {
            return Some((Cow::Borrowed("/"), route));
        }
    }

    None
}
