mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use checkpoint::CheckpointConfig;

#[derive(Parser)]
#[command(name = "checkpoint", version, about = "Reset a test database to an empty state")]
struct Cli {
    /// Config file (defaults to ./checkpoint.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete every row from every table, in foreign-key-safe order
    Reset {
        /// Database file (overrides config)
        #[arg(long)]
        db: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show the deletion order and the statements a reset would run
    Plan {
        /// Database file (overrides config)
        #[arg(long)]
        db: Option<String>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CheckpointConfig::load_from(path)?,
        None => CheckpointConfig::load()?,
    };

    // Log to stderr so stdout stays clean for `plan --json`.
    let filter = EnvFilter::try_new(&config.log.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Reset { db, yes } => {
            if let Some(db) = db {
                config.database.path = db;
            }
            cli::reset::reset(&config, yes).await?;
        }
        Command::Plan { db, json } => {
            if let Some(db) = db {
                config.database.path = db;
            }
            cli::plan::plan(&config, json).await?;
        }
    }

    Ok(())
}
