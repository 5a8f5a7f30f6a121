pub mod decode;
pub mod fetch;
pub mod infer;
pub mod ingest;

use std::path::Path;

use serde::Serialize;

use crate::config::AppConfig;
use crate::decoder::{ParsedBlock, TxFailure};
use crate::errors::AppResult;
use crate::extraction::{ContentLocation, ExtractionMethod};
use crate::ingest::{BlockRecord, ContentSink, DirectorySink};

/// JSON summary printed by `decode` and `fetch`
#[derive(Debug, Serialize)]
pub struct BlockSummary {
    pub height: Option<u64>,
    pub hash: String,
    pub prev_block_hash: String,
    pub time: Option<String>,
    pub version: i32,
    pub size: usize,
    pub declared_tx_count: usize,
    pub decoded_tx_count: usize,
    pub segwit_tx_count: usize,
    pub failures: Vec<TxFailure>,
    pub contents: Vec<ContentSummary>,
}

#[derive(Debug, Serialize)]
pub struct ContentSummary {
    pub txid: String,
    pub location: ContentLocation,
    pub mime_type: &'static str,
    pub method: ExtractionMethod,
    pub declared_type: Option<String>,
    pub size: usize,
}

impl BlockSummary {
    pub fn new(height: Option<u64>, block: &ParsedBlock) -> Self {
        Self {
            height,
            hash: block.header.hash_hex(),
            prev_block_hash: block.header.prev_block_hash_hex(),
            time: block.header.time().map(|t| t.to_rfc3339()),
            version: block.header.version,
            size: block.size,
            declared_tx_count: block.declared_tx_count,
            decoded_tx_count: block.transactions.len(),
            segwit_tx_count: block.transactions.iter().filter(|tx| tx.has_witness).count(),
            failures: block.failures.clone(),
            contents: block
                .contents
                .iter()
                .map(|c| ContentSummary {
                    txid: c.txid.clone(),
                    location: c.location,
                    mime_type: c.mime_type(),
                    method: c.method,
                    declared_type: c.declared_type.clone(),
                    size: c.size(),
                })
                .collect(),
        }
    }

    pub fn print(&self) -> AppResult<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Write a decoded block's contents under `output_dir`
pub async fn write_contents(output_dir: &Path, height: u64, block: ParsedBlock) -> AppResult<()> {
    let record = BlockRecord::from_parsed(height, block);
    DirectorySink::new(output_dir).store_block(&record).await?;
    Ok(())
}

/// Configuration with the provider URL overridden from the command line
pub fn load_config(provider_url: Option<&str>) -> AppResult<AppConfig> {
    let mut config = AppConfig::load()?;
    if let Some(url) = provider_url {
        config.provider.base_url = url.to_string();
    }
    config.validate()?;
    Ok(config)
}
