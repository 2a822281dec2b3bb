//! newsbrief CLI — the main entry point.
//!
//! Commands:
//! - `run`    — Run the digest agent against the mailbox
//! - `doctor` — Diagnose configuration and credentials

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "newsbrief",
    about = "newsbrief — LLM-driven newsletter digest agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the digest agent
    Run {
        /// Custom objective instead of the configured digest run
        #[arg(short, long)]
        objective: Option<String>,

        /// Path to a config file (defaults to ~/.newsbrief/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Diagnose configuration and credentials
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { objective, config } => commands::run::run(objective, config).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
