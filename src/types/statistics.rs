//! Ingest statistics
//!
//! The ingest loop owns an [`IngestStats`] behind a [`StatsHandle`]; anything
//! holding a clone of the handle can take a serialisable [`IngestSnapshot`]
//! while the loop keeps running.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Common trait for statistics collectors
pub trait StatisticsCollector {
    /// Reset all counters to zero
    fn reset(&mut self);

    /// Get the total duration so far
    fn duration(&self) -> Duration;

    /// Items per second over `duration()`
    fn processing_rate(&self) -> f64;

    /// Finalize statistics collection
    fn finish(&mut self);

    /// One-line human readable summary
    fn summary(&self) -> String;
}

/// Common timing information
#[derive(Debug, Clone)]
pub struct TimingInfo {
    pub start_time: Instant,
    pub processing_duration: Duration,
}

impl Default for TimingInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingInfo {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            processing_duration: Duration::default(),
        }
    }

    pub fn finish(&mut self) {
        self.processing_duration = self.start_time.elapsed();
    }

    pub fn elapsed(&self) -> Duration {
        if self.processing_duration.is_zero() {
            self.start_time.elapsed()
        } else {
            self.processing_duration
        }
    }
}

/// Counters maintained by the ingest loop
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub blocks_processed: u64,
    pub blocks_failed: u64,
    pub blocks_abandoned: u64,
    pub transactions_seen: u64,
    pub contents_extracted: u64,
    pub cycles_run: u64,
    pub rate_limited: u64,
    pub last_ingested_height: Option<u64>,
    pub last_cycle_duration: Duration,
    pub timing: TimingInfo,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_block(&mut self, height: u64, transactions: usize, contents: usize) {
        self.blocks_processed += 1;
        self.transactions_seen += transactions as u64;
        self.contents_extracted += contents as u64;
        self.last_ingested_height = Some(
            self.last_ingested_height
                .map_or(height, |last| last.max(height)),
        );
    }

    pub fn record_failure(&mut self, abandoned: bool) {
        self.blocks_failed += 1;
        if abandoned {
            self.blocks_abandoned += 1;
        }
    }

    pub fn record_cycle(&mut self, duration: Duration) {
        self.cycles_run += 1;
        self.last_cycle_duration = duration;
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            blocks_processed: self.blocks_processed,
            blocks_failed: self.blocks_failed,
            blocks_abandoned: self.blocks_abandoned,
            transactions_seen: self.transactions_seen,
            contents_extracted: self.contents_extracted,
            cycles_run: self.cycles_run,
            rate_limited: self.rate_limited,
            last_ingested_height: self.last_ingested_height,
            last_cycle_ms: self.last_cycle_duration.as_millis() as u64,
            uptime_secs: self.duration().as_secs(),
            blocks_per_second: self.processing_rate(),
        }
    }
}

impl StatisticsCollector for IngestStats {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn duration(&self) -> Duration {
        self.timing.elapsed()
    }

    fn processing_rate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.blocks_processed as f64 / secs
        } else {
            0.0
        }
    }

    fn finish(&mut self) {
        self.timing.finish();
    }

    fn summary(&self) -> String {
        format!(
            "Ingest: {} blocks ({} failed), {} transactions, {} contents in {} cycles ({:.2} blocks/s)",
            self.blocks_processed,
            self.blocks_failed,
            self.transactions_seen,
            self.contents_extracted,
            self.cycles_run,
            self.processing_rate()
        )
    }
}

/// Point-in-time copy of [`IngestStats`] for monitoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSnapshot {
    pub blocks_processed: u64,
    pub blocks_failed: u64,
    pub blocks_abandoned: u64,
    pub transactions_seen: u64,
    pub contents_extracted: u64,
    pub cycles_run: u64,
    pub rate_limited: u64,
    pub last_ingested_height: Option<u64>,
    pub last_cycle_ms: u64,
    pub uptime_secs: u64,
    pub blocks_per_second: f64,
}

/// Shared handle to the loop's statistics
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    inner: Arc<Mutex<IngestStats>>,
}

impl StatsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the statistics under the lock
    pub fn update<F: FnOnce(&mut IngestStats)>(&self, f: F) {
        let mut stats = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut stats);
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        self.inner
            .lock()
            .map(|stats| stats.snapshot())
            .unwrap_or_else(|poisoned| poisoned.into_inner().snapshot())
    }

    pub fn summary(&self) -> String {
        self.inner
            .lock()
            .map(|stats| stats.summary())
            .unwrap_or_else(|poisoned| poisoned.into_inner().summary())
    }
}
