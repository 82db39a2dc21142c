//! Strictly Sync - Unified CLI
//!
//! Runs the authoritative server or a terminal client.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use strictly_sync::AppConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Command::Server { host, port } => {
            config.server_mut().override_with(host, port);
            info!(address = %config.server().bind_address(), "Starting server");
            strictly_sync::run_server(config.server()).await
        }
        Command::Play {
            server_url,
            session,
            role,
        } => {
            config.client_mut().override_with(server_url, session, role);
            strictly_sync::play(config.client()).await
        }
    }
}
