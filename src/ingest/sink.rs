//! Persistence seam for ingested blocks
//!
//! The ingest loop hands each successfully decoded block to a
//! [`ContentSink`]. Where the records end up is the sink's business.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::decoder::ParsedBlock;
use crate::errors::{SinkError, SinkResult};
use crate::extraction::{ContentLocation, ExtractedContent, ExtractionMethod};
use crate::types::ContentFormat;

/// Everything the loop reports for one ingested block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRecord {
    pub height: u64,
    pub block_hash: String,
    pub timestamp: u32,
    pub transaction_count: usize,
    pub failed_transactions: usize,
    pub contents: Vec<ExtractedContent>,
}

impl BlockRecord {
    pub fn from_parsed(height: u64, block: ParsedBlock) -> Self {
        Self {
            height,
            block_hash: block.header.hash_hex(),
            timestamp: block.header.timestamp,
            transaction_count: block.transactions.len(),
            failed_transactions: block.failures.len(),
            contents: block.contents,
        }
    }
}

#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn store_block(&self, record: &BlockRecord) -> SinkResult<()>;
}

/// Logs each block and drops it; nothing is retained
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ContentSink for LogSink {
    async fn store_block(&self, record: &BlockRecord) -> SinkResult<()> {
        for content in &record.contents {
            info!(
                "Block {} {} {}: {} ({} bytes)",
                record.height,
                content.txid,
                content.location.label(),
                content.mime_type(),
                content.size()
            );
        }
        Ok(())
    }
}

/// Keeps every record in memory; meant for tests and embedding, it grows
/// with every block stored
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<BlockRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<BlockRecord> {
        self.records.lock().clone()
    }

    pub fn heights(&self) -> Vec<u64> {
        self.records.lock().iter().map(|r| r.height).collect()
    }
}

#[async_trait]
impl ContentSink for MemorySink {
    async fn store_block(&self, record: &BlockRecord) -> SinkResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Entry in a block's `block.json` manifest
#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    txid: &'a str,
    location: ContentLocation,
    format: ContentFormat,
    mime_type: &'static str,
    method: ExtractionMethod,
    declared_type: Option<&'a str>,
    size: usize,
    file: String,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    height: u64,
    block_hash: &'a str,
    timestamp: u32,
    transaction_count: usize,
    failed_transactions: usize,
    contents: Vec<ManifestEntry<'a>>,
}

/// Writes extracted content under a base directory
///
/// Creates: `<base_dir>/<height>/<txid>_<location>.<ext>` per content item,
/// plus `<base_dir>/<height>/block.json` describing the block. Blocks without
/// content produce no files.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    base_dir: PathBuf,
}

impl DirectorySink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File name used for `content`
    pub fn file_name(content: &ExtractedContent) -> String {
        format!(
            "{}_{}.{}",
            content.txid,
            content.location.label(),
            content.format.extension()
        )
    }

    pub fn block_dir(&self, height: u64) -> PathBuf {
        self.base_dir.join(height.to_string())
    }

    async fn write(path: &Path, data: &[u8]) -> SinkResult<()> {
        tokio::fs::write(path, data)
            .await
            .map_err(|source| SinkError::Io {
                path: path.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl ContentSink for DirectorySink {
    async fn store_block(&self, record: &BlockRecord) -> SinkResult<()> {
        if record.contents.is_empty() {
            return Ok(());
        }

        let dir = self.block_dir(record.height);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SinkError::Io {
                path: dir.display().to_string(),
                source,
            })?;

        let mut entries = Vec::with_capacity(record.contents.len());
        for content in &record.contents {
            let file = Self::file_name(content);
            Self::write(&dir.join(&file), &content.data).await?;
            entries.push(ManifestEntry {
                txid: &content.txid,
                location: content.location,
                format: content.format,
                mime_type: content.mime_type(),
                method: content.method,
                declared_type: content.declared_type.as_deref(),
                size: content.size(),
                file,
            });
        }

        let manifest = Manifest {
            height: record.height,
            block_hash: &record.block_hash,
            timestamp: record.timestamp,
            transaction_count: record.transaction_count,
            failed_transactions: record.failed_transactions,
            contents: entries,
        };
        let json = serde_json::to_vec_pretty(&manifest).map_err(|e| SinkError::Rejected {
            height: record.height,
            message: format!("Manifest serialisation failed: {}", e),
        })?;
        Self::write(&dir.join("block.json"), &json).await?;

        debug!(
            "Wrote {} content items for block {} to {}",
            record.contents.len(),
            record.height,
            dir.display()
        );
        Ok(())
    }
}
