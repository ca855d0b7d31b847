//! Command-line driver for the status engine.
//!
//! Loads condition and hazard content from a data directory and runs hazards
//! against an in-memory character.
//!
//! ```bash
//! statusctl run giant-centipede-venom --steps expire@60,increase,recover --modifier 4
//! RUST_LOG=status_runtime=debug statusctl run lethargy-poison -m slowed=1 --json
//! ```

mod commands;
mod config;
mod script;

use anyhow::Result;
use clap::Parser;
use commands::{Catalog, Run};
use config::CliConfig;

/// Status-effect and hazard engine driver
#[derive(Parser)]
#[command(name = "statusctl")]
#[command(about = "Run hazards and resolve status markers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Apply a hazard and run a scripted sequence of steps
    Run(Run),

    /// List known condition types
    Catalog(Catalog),
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::from_env();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(cmd) => cmd.execute(config).await,
        Command::Catalog(cmd) => cmd.execute(config),
    }
}
