//! Ingest loop against an in-memory chain and a directory sink

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use witness_scan::config::{IngestConfig, RateLimitConfig};
use witness_scan::decoder::DecodeOptions;
use witness_scan::errors::{FetchError, FetchResult};
use witness_scan::fetcher::{ChainSource, MockChainSource, RateLimiter};
use witness_scan::ingest::{
    shutdown_channel, BlockIngestor, DirectorySink, HeightStatus, MemorySink, TickOutcome,
};

use crate::common::{block_bytes, legacy_two_in_one_out, segwit_png_transaction};

fn png_block_hex() -> String {
    hex::encode(block_bytes(&[segwit_png_transaction().build()]))
}

fn plain_block_hex() -> String {
    hex::encode(block_bytes(&[legacy_two_in_one_out().build()]))
}

/// In-memory chain behind a real request budget, charged like `BlockFetcher`
struct LimitedSource {
    chain: MockChainSource,
    limiter: RateLimiter,
}

impl LimitedSource {
    fn new(limits: RateLimitConfig, blocks: u64) -> Self {
        let chain = MockChainSource::new();
        for height in 0..blocks {
            chain.add_block(height, plain_block_hex());
        }
        Self {
            chain,
            limiter: RateLimiter::new(limits),
        }
    }
}

#[async_trait]
impl ChainSource for LimitedSource {
    async fn tip_height(&self) -> FetchResult<u64> {
        self.limiter.try_acquire()?;
        self.chain.tip_height().await
    }

    async fn raw_block_hex(&self, height: u64) -> FetchResult<String> {
        self.limiter.try_acquire()?;
        self.chain.raw_block_hex(height).await
    }
}

fn config(start: u64) -> IngestConfig {
    IngestConfig {
        start_height: Some(start),
        poll_interval_seconds: 1,
        max_retries: 3,
        initial_backoff_ms: 10,
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn test_content_written_per_height() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let source = Arc::new(MockChainSource::new());
    source.add_block(100, plain_block_hex());
    source.add_block(101, png_block_hex());

    let sink = Arc::new(DirectorySink::new(temp.path()));
    let mut ingestor = BlockIngestor::new(source, sink, config(100), DecodeOptions::default());

    let outcome = ingestor.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::Completed {
            tip: 101,
            succeeded: 2,
            failed: 0
        }
    );

    // Blocks without content leave no trace on disk
    assert!(!temp.path().join("100").exists());

    let dir = temp.path().join("101");
    let manifest: serde_json::Value = serde_json::from_slice(
        &std::fs::read(dir.join("block.json")).context("manifest missing")?,
    )?;
    assert_eq!(manifest["height"], 101);
    assert_eq!(manifest["contents"].as_array().map(Vec::len), Some(1));
    assert_eq!(manifest["contents"][0]["mime_type"], "image/png");

    let file = manifest["contents"][0]["file"]
        .as_str()
        .context("manifest entry without file name")?;
    assert!(file.ends_with("_w0_0.png"));
    assert_eq!(std::fs::read(dir.join(file))?.len(), 100);
    Ok(())
}

#[tokio::test]
async fn test_transient_failure_retried_next_tick() {
    let source = Arc::new(MockChainSource::new());
    for height in 0..3 {
        source.add_block(height, plain_block_hex());
    }
    source.fail_block_once(1, FetchError::Transport("connection reset".into()));

    let sink = Arc::new(MemorySink::new());
    let mut ingestor =
        BlockIngestor::new(source.clone(), sink.clone(), config(0), DecodeOptions::default());

    ingestor.tick().await;
    assert_eq!(sink.heights(), vec![0, 2]);
    assert_eq!(ingestor.position(), Some(0));
    assert!(matches!(
        ingestor.ledger().unwrap().status(1),
        Some(HeightStatus::Failed { attempts: 1, .. })
    ));

    ingestor.tick().await;
    assert_eq!(sink.heights(), vec![0, 2, 1]);
    assert_eq!(ingestor.position(), Some(2));
    assert_eq!(source.block_requests(), vec![0, 1, 2, 1]);
}

#[tokio::test]
async fn test_starts_at_tip_without_start_height() {
    let source = Arc::new(MockChainSource::new());
    for height in 0..5 {
        source.add_block(height, plain_block_hex());
    }
    let sink = Arc::new(MemorySink::new());
    let config = IngestConfig {
        start_height: None,
        ..config(0)
    };
    let mut ingestor = BlockIngestor::new(source, sink.clone(), config, DecodeOptions::default());

    ingestor.tick().await;
    assert_eq!(sink.heights(), vec![4]);
}

#[tokio::test]
async fn test_run_follows_new_blocks_until_stopped() {
    let source = Arc::new(MockChainSource::new());
    source.add_block(0, plain_block_hex());
    let sink = Arc::new(MemorySink::new());
    let ingestor = BlockIngestor::new(
        source.clone(),
        sink.clone(),
        config(0),
        DecodeOptions::default(),
    );

    let (stop, signal) = shutdown_channel();
    let handle = tokio::spawn(ingestor.run(signal));

    tokio::time::sleep(Duration::from_millis(200)).await;
    source.add_block(1, png_block_hex());
    tokio::time::sleep(Duration::from_millis(1300)).await;
    stop.send(true).unwrap();

    let snapshot = handle.await.unwrap();
    assert_eq!(sink.heights(), vec![0, 1]);
    assert_eq!(snapshot.blocks_processed, 2);
    assert_eq!(snapshot.contents_extracted, 1);
    assert!(snapshot.cycles_run >= 2);
}

#[tokio::test]
async fn test_default_spacing_completes_tick() {
    let source = Arc::new(LimitedSource::new(RateLimitConfig::default(), 2));
    let sink = Arc::new(MemorySink::new());
    let mut ingestor = BlockIngestor::new(source, sink.clone(), config(0), DecodeOptions::default());

    let outcome = ingestor.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::Completed {
            tip: 1,
            succeeded: 2,
            failed: 0
        }
    );
    assert_eq!(sink.heights(), vec![0, 1]);
    assert!(ingestor.stats().snapshot().rate_limited >= 1);
}

#[tokio::test]
async fn test_spent_window_leaves_heights_pending() {
    let limits = RateLimitConfig {
        max_requests: 2,
        window_seconds: 3600,
        min_interval_ms: 0,
    };
    let source = Arc::new(LimitedSource::new(limits, 3));
    let sink = Arc::new(MemorySink::new());
    let mut ingestor = BlockIngestor::new(source, sink.clone(), config(0), DecodeOptions::default());

    let outcome = ingestor.tick().await;
    assert!(matches!(
        outcome,
        TickOutcome::RateLimited { succeeded: 1, .. }
    ));
    assert_eq!(sink.heights(), vec![0]);
    assert_eq!(ingestor.position(), Some(0));
    assert_eq!(
        ingestor.ledger().unwrap().status(1),
        Some(&HeightStatus::Pending)
    );
}

#[tokio::test]
async fn test_stop_interrupts_rate_limit_wait() {
    let limits = RateLimitConfig {
        max_requests: 100,
        window_seconds: 3600,
        min_interval_ms: 900,
    };
    let source = Arc::new(LimitedSource::new(limits, 1));
    let sink = Arc::new(MemorySink::new());
    let ingestor = BlockIngestor::new(source, sink.clone(), config(0), DecodeOptions::default());

    let (stop, signal) = shutdown_channel();
    let handle = tokio::spawn(ingestor.run(signal));

    // The tip query took the only slot; block 0 waits on the spacing
    tokio::time::sleep(Duration::from_millis(200)).await;
    stop.send(true).unwrap();

    let snapshot = tokio::time::timeout(Duration::from_millis(500), handle)
        .await
        .expect("loop did not stop during the rate limit wait")
        .unwrap();
    assert!(sink.heights().is_empty());
    assert_eq!(snapshot.blocks_processed, 0);
    assert_eq!(snapshot.rate_limited, 1);
}
