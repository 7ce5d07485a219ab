//! Resolved serve configuration.
//!
//! The CLI layer parses flags and environment fallbacks; this struct is
//! what the rest of the server consumes. Captured once at startup and
//! read-only afterwards.

use crate::compress::Levels;
use std::net::IpAddr;
use std::path::PathBuf;

/// Everything the server core needs to know.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Directory whose tree is served
    pub root: PathBuf,
    /// Network interface to bind
    pub interface: IpAddr,
    /// Base port (retried upwards when busy)
    pub port: u16,
    /// Serve the root index for unmatched paths
    pub spa: bool,
    /// Re-stat and rebuild routes on file modification
    pub dev: bool,
    /// Env var prefix copied into the template context
    pub config_prefix: String,
    /// Log each request
    pub log_requests: bool,
    /// Compression levels for precompressed variants
    pub levels: Levels,
}

impl ServeConfig {
    /// Minimal config for unit tests: serve `root`, everything else off.
    #[cfg(test)]
    pub fn for_tests(root: &std::path::Path) -> Self {
        Self {
            root: root.to_path_buf(),
            interface: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 0,
            spa: false,
            dev: false,
            config_prefix: String::from("DARTER_TEST_NONE_"),
            log_requests: false,
            levels: Levels::default(),
        }
    }
}
