// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kasa - offline-aware chat delivery and synchronization engine.
//!
//! This is the binary entry point for the Kasa maintenance CLI: inspect the
//! local message store, replay the unsynced backlog, and run the retention
//! sweep, all against the same database the embedding application uses.

use clap::{Parser, Subcommand};

mod purge;
mod status;
mod sync;

/// Kasa - offline-aware chat delivery and synchronization engine.
#[derive(Parser, Debug)]
#[command(name = "kasa", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show local store counts and sync backlog state.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Replay pending messages against the server.
    Sync,
    /// Reset failed messages to pending and replay them.
    Retry,
    /// Delete synced messages older than the retention window.
    Purge,
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kasa={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing("info");

    // Load and validate configuration at startup
    let config = match kasa_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kasa_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        Some(Commands::Sync) => sync::run_sync(&config, false).await,
        Some(Commands::Retry) => sync::run_sync(&config, true).await,
        Some(Commands::Purge) => purge::run_purge(&config).await,
        None => {
            println!("kasa: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("kasa: {e}");
        std::process::exit(1);
    }
}
