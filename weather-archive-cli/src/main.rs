//! Binary crate for the `weather-archive` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and logging setup
//! - Interactive configuration
//! - Terminal tables and the web dashboard over stored snapshots

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;
mod dashboard;
mod table;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cmd = cli::Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cmd.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    cmd.run().await
}
