use crate::cli::commands::{write_contents, BlockSummary};
use crate::config::AppConfig;
use crate::decoder::{decode_block_hex_with, decode_block_with, ParsedBlock, TxFailurePolicy};
use crate::errors::AppResult;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Decode a raw block from a file
#[derive(Args)]
pub struct DecodeCommand {
    /// Block file (binary, or hex with --hex)
    #[arg(long)]
    pub file: PathBuf,

    /// File contains hex text rather than raw bytes
    #[arg(long)]
    pub hex: bool,

    /// Height reported in the summary and used for the output directory (default 0)
    #[arg(long)]
    pub height: Option<u64>,

    /// Keep the transactions decoded before a failing one instead of failing the block
    #[arg(long)]
    pub keep_decoded: bool,

    /// Write extracted content to this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl DecodeCommand {
    pub async fn run(&self) -> AppResult<()> {
        let config = AppConfig::get_defaults();
        let mut options = config.decoder.options();
        if self.keep_decoded {
            options.tx_failure_policy = TxFailurePolicy::KeepDecoded;
        }

        info!("Decoding block from {}", self.file.display());
        let block = if self.hex {
            let text = tokio::fs::read_to_string(&self.file).await?;
            decode_block_hex_with(&text, options)?
        } else {
            let bytes = tokio::fs::read(&self.file).await?;
            decode_block_with(&bytes, options)?
        };

        self.summary(&block).print()?;

        if let Some(output_dir) = &self.output_dir {
            let count = block.contents.len();
            write_contents(output_dir, self.height.unwrap_or(0), block).await?;
            info!("Wrote {} content items to {}", count, output_dir.display());
        }
        Ok(())
    }

    fn summary(&self, block: &ParsedBlock) -> BlockSummary {
        BlockSummary::new(self.height, block)
    }
}
