use crate::cli::commands::{load_config, write_contents, BlockSummary};
use crate::decoder::decode_block_hex_with;
use crate::errors::AppResult;
use crate::fetcher::{BlockFetcher, ChainSource, RateLimiter};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Fetch and decode a single block by height
#[derive(Args)]
pub struct FetchCommand {
    /// Block height to fetch
    pub height: u64,

    /// Provider base URL (overrides config.toml)
    #[arg(long)]
    pub provider_url: Option<String>,

    /// Write extracted content to this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Also save the raw block hex next to the content
    #[arg(long)]
    pub save_raw: bool,
}

impl FetchCommand {
    pub async fn run(&self) -> AppResult<()> {
        let config = load_config(self.provider_url.as_deref())?;
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        let fetcher = BlockFetcher::new(config.provider.clone(), limiter)?;

        info!("Fetching block {} from {}", self.height, fetcher.block_url(self.height));
        let block_hex = fetcher.raw_block_hex(self.height).await?;
        let block = decode_block_hex_with(&block_hex, config.decoder.options())?;

        BlockSummary::new(Some(self.height), &block).print()?;

        if let Some(output_dir) = &self.output_dir {
            if self.save_raw {
                let dir = output_dir.join(self.height.to_string());
                tokio::fs::create_dir_all(&dir).await?;
                tokio::fs::write(dir.join("block.hex"), block_hex.as_bytes()).await?;
            }
            let count = block.contents.len();
            write_contents(output_dir, self.height, block).await?;
            info!("Wrote {} content items to {}", count, output_dir.display());
        }
        Ok(())
    }
}
