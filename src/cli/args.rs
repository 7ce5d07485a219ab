//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Darter static file server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve a directory tree from memory
    #[command(visible_alias = "s")]
    Serve {
        /// Directory to serve
        #[arg(env = "PUBLIC_DIR", default_value = "public", value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long, default_value = "0.0.0.0")]
        interface: IpAddr,

        /// Port number to listen on
        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,

        /// Rebuild routes when files change on disk
        #[arg(short, long, env = "DEV_MODE")]
        dev: bool,

        /// Serve the root index for unmatched paths (client-side routing)
        #[arg(long, env = "SPA_MODE")]
        spa: bool,

        /// Environment variable prefix injected into HTML templates
        #[arg(long, env = "CONFIG_PREFIX", default_value = "VITE_")]
        config_prefix: String,

        /// Log each request
        #[arg(long, env = "LOG_REQUESTS")]
        log_requests: bool,
    },
}
