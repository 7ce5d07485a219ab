//! HTTP serving: listener lifecycle and response assembly.
//!
//! The core work happens in [`dispatch`]; this module owns everything
//! around it: binding the listener, fanning requests out to the rayon
//! pool, translating a dispatch [`Outcome`] into a `tiny_http` response,
//! and request logging.

pub mod dispatch;
pub mod encoding;
pub mod refresh;

use crate::cache::RouteCache;
use crate::compress::Encoding;
use crate::config::ServeConfig;
use crate::template::TemplateContext;
use crate::utils::date::DateTimeUtc;
use crate::{debug, log};
use anyhow::{Context, Result};
use dispatch::Outcome;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::io::{self, Cursor};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Value of the fixed `Server` header.
const SERVER_NAME: &str = concat!("darter/", env!("CARGO_PKG_VERSION"));

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Everything a request handler needs, owned in one place and shared by
/// reference across the pool.
pub struct ServerState {
    pub config: ServeConfig,
    pub templates: TemplateContext,
    pub cache: RouteCache,
    pub requests: AtomicU64,
    pub errors: AtomicU64,
}

impl ServerState {
    /// Snapshot the environment and build every route up front.
    pub fn new(config: ServeConfig) -> Result<Self> {
        let templates = TemplateContext::from_env(&config.config_prefix);
        let cache = RouteCache::new();
        cache.populate(&config.root, &templates, config.levels)?;
        Ok(Self {
            config,
            templates,
            cache,
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }
}

/// Build all routes, bind the listener, and run the request loop until
/// shutdown is requested.
pub fn run(config: ServeConfig) -> Result<()> {
    let started = Instant::now();
    let state = Arc::new(ServerState::new(config)?);
    log!(
        "routes";
        "{} paths from {} in {:.1?}",
        state.cache.len(),
        state.config.root.display(),
        started.elapsed()
    );

    let (server, addr) = bind_with_retry(state.config.interface, state.config.port)?;
    let server = Arc::new(server);
    crate::state::register_server(Arc::clone(&server));
    log!("serve"; "http://{addr}");
    if state.config.spa {
        debug!("serve"; "spa mode: unmatched paths fall back to /");
    }
    if state.config.dev {
        debug!("serve"; "dev mode: routes rebuild on file modification");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("darter-worker-{i}"))
        .build()
        .context("failed to create worker pool")?;

    // Blocks until the shutdown handler unblocks the listener
    for request in server.incoming_requests() {
        let state = Arc::clone(&state);
        pool.spawn(move || handle_request(request, &state));
    }

    log!(
        "serve";
        "served {} requests ({} errors)",
        state.requests.load(Ordering::Relaxed),
        state.errors.load(Ordering::Relaxed)
    );
    Ok(())
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &ServerState) {
    // Requests already in flight when Ctrl+C lands get a clean refusal
    if crate::state::is_shutdown() {
        let headers = vec![
            header("Server", SERVER_NAME),
            header("Content-Type", "text/plain"),
        ];
        let _ = send_body(request, 503, headers, b"503 Service Unavailable".to_vec(), false);
        return;
    }

    let started = Instant::now();
    state.requests.fetch_add(1, Ordering::Relaxed);

    let method = request.method().clone();
    let url = request.url().to_string();
    let accept_encoding = header_value(&request, "Accept-Encoding");
    let if_none_match = header_value(&request, "If-None-Match");

    let outcome = match normalize_url(&url) {
        Some(path) => dispatch::dispatch(
            &method,
            &path,
            accept_encoding.as_deref(),
            if_none_match.as_deref(),
            state,
        ),
        None => Outcome::BadRequest,
    };

    let status = outcome.status();
    if status >= 400 {
        state.errors.fetch_add(1, Ordering::Relaxed);
    }

    match respond(request, outcome) {
        Ok(bytes) => {
            if state.config.log_requests {
                log!("serve"; "{method} {url} {status} {bytes}B {:.1?}", started.elapsed());
            }
        }
        Err(e) => debug!("serve"; "{method} {url}: client went away: {e}"),
    }
}

/// Decode the raw request URL into the path the dispatcher sees.
///
/// Strips the query string, percent-decodes, and requires the result to
/// be valid UTF-8. Returns `None` for undecodable paths (answered 400).
fn normalize_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    Some(decoded.into_owned())
}

/// Case-insensitive request header lookup.
fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_string())
}

/// Health payload, rebuilt per probe for a current timestamp.
#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: String,
}

/// Shared body buffer handed to `tiny_http` without copying.
struct SharedBody(Arc<[u8]>);

impl AsRef<[u8]> for SharedBody {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Write one dispatch outcome to the wire. Returns the body length sent
/// (what `Content-Length` advertised, even for `HEAD`).
fn respond(request: Request, outcome: Outcome) -> io::Result<usize> {
    match outcome {
        Outcome::Serve {
            route,
            encoding,
            head,
        } => {
            let body = route
                .content
                .variant(encoding)
                .cloned()
                .unwrap_or_else(|| route.content.plain.clone());
            let len = body.len();

            let mut headers = vec![
                header("Server", SERVER_NAME),
                header("Content-Type", route.headers.content_type),
                header("ETag", &route.headers.etag),
                header("Last-Modified", &route.headers.last_modified),
                header("Cache-Control", route.headers.cache_control),
            ];
            if encoding != Encoding::Identity {
                headers.push(header("Content-Encoding", encoding.name()));
            }

            if head {
                request.respond(Response::new(
                    StatusCode(200),
                    headers,
                    io::empty(),
                    Some(len),
                    None,
                ))?;
            } else {
                request.respond(Response::new(
                    StatusCode(200),
                    headers,
                    Cursor::new(SharedBody(body)),
                    Some(len),
                    None,
                ))?;
            }
            Ok(len)
        }

        Outcome::NotModified { route } => {
            let response = Response::empty(StatusCode(304))
                .with_header(header("Server", SERVER_NAME))
                .with_header(header("ETag", &route.headers.etag))
                .with_header(header("Last-Modified", &route.headers.last_modified))
                .with_header(header("Cache-Control", route.headers.cache_control));
            request.respond(response)?;
            Ok(0)
        }

        Outcome::Health { head } => {
            let payload = HealthStatus {
                status: "ok",
                timestamp: DateTimeUtc::now().to_rfc3339(),
            };
            let body = serde_json::to_string(&payload).unwrap_or_default();
            let headers = vec![
                header("Server", SERVER_NAME),
                header("Content-Type", "application/json"),
            ];
            send_body(request, 200, headers, body.into_bytes(), head)
        }

        Outcome::BadRequest => {
            let headers = vec![
                header("Server", SERVER_NAME),
                header("Content-Type", "text/plain"),
            ];
            send_body(request, 400, headers, b"400 Bad Request".to_vec(), false)
        }

        Outcome::NotFound { head } => {
            let headers = vec![
                header("Server", SERVER_NAME),
                header("Content-Type", "text/plain"),
            ];
            send_body(request, 404, headers, b"404 Not Found".to_vec(), head)
        }

        Outcome::MethodNotAllowed => {
            let headers = vec![
                header("Server", SERVER_NAME),
                header("Content-Type", "text/plain"),
                header("Allow", "GET, HEAD"),
            ];
            send_body(
                request,
                405,
                headers,
                b"405 Method Not Allowed".to_vec(),
                false,
            )
        }
    }
}

fn send_body(
    request: Request,
    status: u16,
    headers: Vec<Header>,
    body: Vec<u8>,
    head: bool,
) -> io::Result<usize> {
    let len = body.len();
    if head {
        request.respond(Response::new(
            StatusCode(status),
            headers,
            io::empty(),
            Some(len),
            None,
        ))?;
    } else {
        request.respond(Response::new(
            StatusCode(status),
            headers,
            Cursor::new(body),
            Some(len),
            None,
        ))?;
    }
    Ok(len)
}

fn header(key: &str, value: &str) -> Header {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_query() {
        assert_eq!(normalize_url("/page?x=1").as_deref(), Some("/page"));
        assert_eq!(normalize_url("/page").as_deref(), Some("/page"));
    }

    #[test]
    fn test_normalize_url_decodes_percent() {
        assert_eq!(
            normalize_url("/with%20space.html").as_deref(),
            Some("/with space.html")
        );
    }

    #[test]
    fn test_normalize_url_rejects_bad_utf8() {
        assert_eq!(normalize_url("/%ff%fe"), None);
    }

    #[test]
    fn test_health_payload_shape() {
        let payload = HealthStatus {
            status: "ok",
            timestamp: DateTimeUtc::from_unix(0).to_rfc3339(),
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"status":"ok","timestamp":"1970-01-01T00:00:00Z"}"#
        );
    }

    #[test]
    fn test_server_header_value() {
        assert!(SERVER_NAME.starts_with("darter/"));
    }
}
