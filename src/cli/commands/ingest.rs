use crate::cli::commands::load_config;
use crate::errors::{AppError, AppResult};
use crate::fetcher::{BlockFetcher, RateLimiter};
use crate::ingest::{shutdown_channel, BlockIngestor, ContentSink, DirectorySink, LogSink};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Run the block ingest loop until Ctrl-C
#[derive(Args)]
pub struct IngestCommand {
    /// First height to ingest (default: chain tip at startup)
    #[arg(long)]
    pub start_height: Option<u64>,

    /// Poll interval in seconds (overrides config.toml)
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Provider base URL (overrides config.toml)
    #[arg(long)]
    pub provider_url: Option<String>,

    /// Write extracted content to this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl IngestCommand {
    pub async fn run(&self) -> AppResult<()> {
        let mut config = load_config(self.provider_url.as_deref())?;
        if let Some(start) = self.start_height {
            config.ingest.start_height = Some(start);
        }
        if let Some(secs) = self.poll_interval {
            config.ingest.poll_interval_seconds = secs;
        }
        if let Some(dir) = &self.output_dir {
            config.ingest.output_dir = Some(dir.clone());
        }
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        let fetcher = Arc::new(BlockFetcher::new(config.provider.clone(), limiter)?);
        let sink: Arc<dyn ContentSink> = match &config.ingest.output_dir {
            Some(dir) => {
                info!("Writing extracted content to {}", dir.display());
                Arc::new(DirectorySink::new(dir.clone()))
            }
            None => {
                warn!("No output directory configured; extracted content is only logged");
                Arc::new(LogSink)
            }
        };

        let ingestor = BlockIngestor::new(
            fetcher,
            sink,
            config.ingest.clone(),
            config.decoder.options(),
        );
        let stats = ingestor.stats();

        let (stop, signal) = shutdown_channel();
        let loop_task = tokio::spawn(ingestor.run(signal));

        tokio::signal::ctrl_c().await?;
        info!("Stop requested, finishing current tick");
        let _ = stop.send(true);

        let snapshot = loop_task
            .await
            .map_err(|e| AppError::InvalidData(format!("Ingest task failed: {}", e)))?;
        info!("{}", stats.summary());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        Ok(())
    }
}
