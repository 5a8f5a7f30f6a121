use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Bitcoin raw block decoder and embedded content recovery
#[derive(Parser)]
#[command(name = "witness-scan")]
#[command(about = "Decode raw Bitcoin blocks and recover content embedded in witnesses and scripts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Decode a raw (binary or hex) block file and summarise it
    Decode(commands::decode::DecodeCommand),
    /// Fetch one block from the provider, decode and summarise it
    Fetch(commands::fetch::FetchCommand),
    /// Poll the provider and ingest new blocks until interrupted
    Ingest(commands::ingest::IngestCommand),
    /// Infer the content type of a file
    Infer(commands::infer::InferCommand),
}

pub async fn run() -> AppResult<()> {
    // Uses RUST_LOG environment variable (defaults to info for this crate)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("witness_scan=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode(command) => command.run().await,
        Commands::Fetch(command) => command.run().await,
        Commands::Ingest(command) => command.run().await,
        Commands::Infer(command) => command.run(),
    }
}
