//! Darter - a memory-first static file server.
//!
//! Walks the served directory once at startup, templates and precompresses
//! everything, and answers requests from memory from then on.

mod cache;
mod cli;
mod compress;
mod config;
mod logger;
mod mime;
mod route;
mod serve;
mod state;
mod template;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ServeConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    state::setup_shutdown_handler()?;

    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    match cli.command {
        Commands::Serve {
            dir,
            interface,
            port,
            dev,
            spa,
            config_prefix,
            log_requests,
        } => serve::run(ServeConfig {
            root: dir,
            interface,
            port,
            spa,
            dev,
            config_prefix,
            log_requests,
            levels: compress::Levels::default(),
        }),
    }
}
