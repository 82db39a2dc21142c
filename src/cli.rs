//! Command-line interface for strictly_sync.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strictly_sync::Role;

/// Strictly Sync - authoritative tic-tac-toe over WebSocket
#[derive(Parser, Debug)]
#[command(name = "strictly_sync")]
#[command(about = "Authoritative state sync for two-player tic-tac-toe", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the authoritative game server
    Server {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Join a session and play from the terminal
    Play {
        /// Game server URL (HTTP or WebSocket)
        #[arg(long)]
        server_url: Option<String>,

        /// Session to join
        #[arg(long)]
        session: Option<String>,

        /// Role to play (first-mover or second-mover)
        #[arg(long)]
        role: Option<Role>,
    },
}
