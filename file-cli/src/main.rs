//! # openfiles
//!
//! Replay and check event logs against the open-file cache.
//!
//! ## Commands
//!
//! - `replay`: Apply a log and print the resulting open files
//! - `check`: Apply a log and fail if any event is rejected
//!
//! ## Example
//!
//! ```bash
//! # Show the state a session log ends in, with every canonical event
//! openfiles replay session.jsonl --emit-events
//!
//! # Verify a log in CI
//! openfiles check session.jsonl
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{check, replay};
use config::Config;

/// Replay and check open-file event logs.
#[derive(Parser, Debug)]
#[command(name = "openfiles")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply an event log and print the resulting state
    Replay {
        /// JSON-lines event log
        log: PathBuf,

        /// Abort at the first rejected event
        #[arg(long)]
        stop_on_error: bool,

        /// Print every canonical event as a JSON line
        #[arg(long)]
        emit_events: bool,
    },

    /// Apply an event log, reporting only rejected events
    Check {
        /// JSON-lines event log
        log: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Replay {
            log,
            stop_on_error,
            emit_events,
        } => {
            // Flags can only switch behaviour on.
            let options = replay::ReplayOptions {
                stop_on_error: stop_on_error || config.replay.stop_on_error,
                emit_events: emit_events || config.replay.emit_events,
            };
            replay::run(&log, options).await?;
        }
        Commands::Check { log } => {
            check::run(&log).await?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the configured filter.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
