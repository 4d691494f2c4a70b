//! # AutoRunner
//!
//! Headless driver for the AutoRunner track generator.
//!
//! Usage: `autorunner [config.toml]`. Without an argument the configuration
//! is read from `autorunner.toml` in the working directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use runner_engine::config::CONFIG_FILE;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("autorunner=info".parse()?)
                .add_directive("runner_engine=info".parse()?)
                .add_directive("runner_gameplay=info".parse()?)
                .add_directive("runner_track=info".parse()?),
        )
        .init();

    info!("AutoRunner starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    runner_engine::app::run(&config_path)?;

    info!("AutoRunner shutdown complete");
    Ok(())
}
