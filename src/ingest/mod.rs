//! Block ingest loop
//!
//! One background task polls the chain tip on a timer, then fetches, decodes
//! and extracts every missing height in ascending order and hands the result
//! to a [`ContentSink`]. A failing height is recorded in the
//! [`IngestLedger`] and the loop moves on; it never stops because of a single
//! block.
//!
//! A request refused by the rate limiter is retried within the same tick once
//! the limiter's `retry_after` has passed, as long as that wait is no longer
//! than one poll interval. A longer wait means the window budget is spent and
//! the tick ends; the remaining heights stay pending for the next one.
//!
//! Shutdown is cooperative: the stop signal is checked between ticks and while
//! a tick waits on the rate limiter. Block work in flight always completes.

pub mod ledger;
pub mod sink;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::decoder::{decode_block_hex_with, DecodeOptions};
use crate::errors::{AppError, AppResult, FetchError};
use crate::fetcher::{Backoff, ChainSource};
use crate::types::statistics::{IngestSnapshot, StatisticsCollector, StatsHandle};

pub use ledger::{HeightStatus, IngestLedger};
pub use sink::{BlockRecord, ContentSink, DirectorySink, LogSink, MemorySink};

/// Result of one polling cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tip queried and every scheduled height attempted
    Completed {
        tip: u64,
        succeeded: usize,
        failed: usize,
    },
    /// The window budget ran out (or stop was raised while waiting on it);
    /// remaining heights wait for the next tick
    RateLimited {
        succeeded: usize,
        retry_after: Duration,
    },
    /// The tip query failed; the loop waits `retry_in` before polling again
    TipUnavailable { error: String, retry_in: Duration },
}

/// Create the stop signal for [`BlockIngestor::run`]
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub struct BlockIngestor {
    source: Arc<dyn ChainSource>,
    sink: Arc<dyn ContentSink>,
    config: IngestConfig,
    decode_options: DecodeOptions,
    /// Created once the first tip is known when no start height is configured
    ledger: Option<IngestLedger>,
    stats: StatsHandle,
    tip_backoff: Backoff,
    /// Set by [`BlockIngestor::run`] so rate-limit waits end on stop
    shutdown: Option<watch::Receiver<bool>>,
}

impl BlockIngestor {
    pub fn new(
        source: Arc<dyn ChainSource>,
        sink: Arc<dyn ContentSink>,
        config: IngestConfig,
        decode_options: DecodeOptions,
    ) -> Self {
        let ledger = config
            .start_height
            .map(|start| IngestLedger::new(start, config.max_retries));
        let tip_backoff = Backoff::new(
            config.initial_backoff(),
            config.backoff_multiplier,
            config.max_backoff_seconds,
        );
        Self {
            source,
            sink,
            config,
            decode_options,
            ledger,
            stats: StatsHandle::new(),
            tip_backoff,
            shutdown: None,
        }
    }

    /// Cloneable handle for reading statistics while the loop runs
    pub fn stats(&self) -> StatsHandle {
        self.stats.clone()
    }

    pub fn ledger(&self) -> Option<&IngestLedger> {
        self.ledger.as_ref()
    }

    /// Last ingested height (the chain position)
    pub fn position(&self) -> Option<u64> {
        self.ledger.as_ref().and_then(IngestLedger::position)
    }

    /// Poll until the stop signal is raised, then return the final statistics
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> IngestSnapshot {
        info!(
            "Starting ingest loop (poll every {}s)",
            self.config.poll_interval_seconds
        );
        self.shutdown = Some(shutdown.clone());
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            if let TickOutcome::TipUnavailable { retry_in, .. } = self.tick().await {
                tokio::select! {
                    _ = sleep(retry_in) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }

        self.stats.update(|s| s.finish());
        info!("Ingest loop stopped: {}", self.stats.summary());
        self.stats.snapshot()
    }

    /// Run one polling cycle
    pub async fn tick(&mut self) -> TickOutcome {
        let started = Instant::now();
        let outcome = self.poll_and_ingest().await;
        let elapsed = started.elapsed();
        self.stats.update(|s| s.record_cycle(elapsed));
        debug!("Ingest tick finished in {:?}: {:?}", elapsed, outcome);
        outcome
    }

    async fn poll_and_ingest(&mut self) -> TickOutcome {
        let tip = loop {
            match self.source.tip_height().await {
                Ok(tip) => {
                    self.tip_backoff.reset();
                    break tip;
                }
                Err(FetchError::RateLimited { retry_after }) => {
                    self.stats.update(|s| s.rate_limited += 1);
                    if !self.wait_for_budget(retry_after).await {
                        return TickOutcome::RateLimited {
                            succeeded: 0,
                            retry_after,
                        };
                    }
                }
                Err(e) => {
                    let retry_in = self.tip_backoff.next_delay();
                    warn!("Tip query failed, retrying in {:?}: {}", retry_in, e);
                    return TickOutcome::TipUnavailable {
                        error: e.to_string(),
                        retry_in,
                    };
                }
            }
        };

        let max_retries = self.config.max_retries;
        let ledger = self
            .ledger
            .get_or_insert_with(|| IngestLedger::new(tip, max_retries));
        let heights = ledger.schedule(tip, self.config.max_blocks_per_tick);
        if heights.is_empty() {
            debug!("No new blocks (tip {})", tip);
        }

        let mut succeeded = 0;
        let mut failed = 0;
        for height in heights {
            let result = loop {
                match self.ingest_height(height).await {
                    Err(AppError::Fetch(FetchError::RateLimited { retry_after })) => {
                        self.stats.update(|s| s.rate_limited += 1);
                        if !self.wait_for_budget(retry_after).await {
                            debug!("Rate limited at height {}, ending tick", height);
                            return TickOutcome::RateLimited {
                                succeeded,
                                retry_after,
                            };
                        }
                    }
                    other => break other,
                }
            };

            match result {
                Ok(record) => {
                    info!(
                        "Ingested block {} ({}): {} transactions, {} content items",
                        height,
                        record.block_hash,
                        record.transaction_count,
                        record.contents.len()
                    );
                    self.stats.update(|s| {
                        s.record_block(height, record.transaction_count, record.contents.len())
                    });
                    self.ledger_mut(tip).record_success(height);
                    succeeded += 1;
                }
                Err(e) => {
                    let retryable = is_retryable(&e);
                    let status = self
                        .ledger_mut(tip)
                        .record_failure(height, &e.to_string(), retryable);
                    let abandoned = matches!(status, HeightStatus::Abandoned { .. });
                    warn!(
                        "Block {} failed (attempt {}, {}): {}",
                        height,
                        status.attempts(),
                        if abandoned { "abandoned" } else { "will retry" },
                        e
                    );
                    self.stats.update(|s| s.record_failure(abandoned));
                    failed += 1;
                }
            }
        }

        TickOutcome::Completed {
            tip,
            succeeded,
            failed,
        }
    }

    /// Sleep out a rate-limit refusal. Returns false when the tick should end
    /// instead: the wait exceeds one poll interval, or stop was raised.
    async fn wait_for_budget(&mut self, retry_after: Duration) -> bool {
        if retry_after > self.config.poll_interval() {
            debug!("Request budget spent, next slot in {:?}", retry_after);
            return false;
        }
        let Some(shutdown) = self.shutdown.as_mut() else {
            sleep(retry_after).await;
            return true;
        };
        if *shutdown.borrow() {
            return false;
        }

        let closed = tokio::select! {
            _ = sleep(retry_after) => false,
            changed = shutdown.changed() => changed.is_err(),
        };
        !closed && !*shutdown.borrow()
    }

    /// Fetch, decode, extract and store one height
    async fn ingest_height(&self, height: u64) -> AppResult<BlockRecord> {
        let block_hex = self.source.raw_block_hex(height).await?;
        let block = decode_block_hex_with(&block_hex, self.decode_options)?;
        let record = BlockRecord::from_parsed(height, block);
        self.sink.store_block(&record).await?;
        Ok(record)
    }

    fn ledger_mut(&mut self, tip: u64) -> &mut IngestLedger {
        let max_retries = self.config.max_retries;
        self.ledger
            .get_or_insert_with(|| IngestLedger::new(tip, max_retries))
    }
}

/// Decode failures are terminal: the same bytes decode the same way
fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::Fetch(e) => e.is_retryable(),
        AppError::Sink(_) | AppError::Io(_) => true,
        AppError::Decode(_) | AppError::Config(_) | AppError::InvalidData(_) => false,
    }
}
