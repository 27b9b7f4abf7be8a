//! Fieldsync CLI - Command-line interface for Fieldsync
//!
//! Provides commands for:
//! - Running a sync pass
//! - Viewing sync and queue status
//! - Inspecting the mutation queue, including permanently failed entries

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{queue::QueueCommand, status::StatusCommand, sync::SyncCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "fieldsync", version, about = "Offline-first record synchronization")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one synchronization pass against the remote store
    Sync(SyncCommand),
    /// Show synchronization status
    Status(StatusCommand),
    /// Inspect the mutation queue
    Queue(QueueCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, cli.config).await,
        Commands::Status(cmd) => cmd.execute(format, cli.config).await,
        Commands::Queue(cmd) => cmd.execute(format, cli.config).await,
    }
}
