//! intake - run and check structured intake interviews.

mod commands;
mod repl;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Structured grant-application interviews driven by a validated LLM turn contract", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the application fields in interview order
    Fields {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a stored provider response against the turn contract
    Check {
        /// File holding the raw provider response
        file: PathBuf,
    },

    /// Run an interactive interview
    Interview {
        /// Runtime config (YAML)
        #[arg(long)]
        config: PathBuf,

        /// Write the finalized snapshot here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("intake=info,intake_core=info,intake_runtime=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fields { json } => commands::fields(json),
        Commands::Check { file } => commands::check(&file),
        Commands::Interview { config, output } => {
            commands::interview(&config, output.as_deref()).await
        }
    }
}
