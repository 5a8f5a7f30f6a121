//! Per-height ingest status
//!
//! The ledger replaces a single "last processed height" counter. Every height
//! between the chain position and the tip has an explicit status, and the
//! position only moves over a contiguous run of settled heights, so a failed
//! height is never skipped silently and never retried forever.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

/// Abandoned heights remembered individually; older ones are only counted
pub const RECENT_ABANDONED: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HeightStatus {
    Pending,
    Succeeded,
    Failed {
        attempts: u32,
        retryable: bool,
        last_error: String,
    },
    /// Given up on: terminal failure or retries exhausted
    Abandoned { attempts: u32, last_error: String },
}

impl HeightStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, HeightStatus::Succeeded | HeightStatus::Abandoned { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            HeightStatus::Failed { attempts, .. } | HeightStatus::Abandoned { attempts, .. } => {
                *attempts
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestLedger {
    /// Lowest height not yet settled
    next_height: u64,
    entries: BTreeMap<u64, HeightStatus>,
    max_attempts: u32,
    recent_abandoned: VecDeque<u64>,
    abandoned_total: u64,
}

impl IngestLedger {
    /// Ledger whose first height to ingest is `start_height`
    pub fn new(start_height: u64, max_attempts: u32) -> Self {
        Self {
            next_height: start_height,
            entries: BTreeMap::new(),
            max_attempts: max_attempts.max(1),
            recent_abandoned: VecDeque::new(),
            abandoned_total: 0,
        }
    }

    /// Last height of the contiguous settled prefix (the chain position)
    pub fn position(&self) -> Option<u64> {
        self.next_height.checked_sub(1)
    }

    pub fn next_height(&self) -> u64 {
        self.next_height
    }

    /// Status of `height`; heights below the position are settled and pruned
    pub fn status(&self, height: u64) -> Option<&HeightStatus> {
        self.entries.get(&height)
    }

    /// Most recently abandoned heights, oldest first, at most
    /// [`RECENT_ABANDONED`] of them
    pub fn abandoned(&self) -> Vec<u64> {
        self.recent_abandoned.iter().copied().collect()
    }

    pub fn abandoned_count(&self) -> u64 {
        self.abandoned_total
    }

    /// Unsettled heights up to `tip`, ascending, at most `limit` of them.
    ///
    /// Newly seen heights are registered as pending.
    pub fn schedule(&mut self, tip: u64, limit: usize) -> Vec<u64> {
        let mut heights = Vec::new();
        let mut height = self.next_height;
        while height <= tip && heights.len() < limit {
            let status = self.entries.entry(height).or_insert(HeightStatus::Pending);
            if !status.is_settled() {
                heights.push(height);
            }
            height = match height.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        heights
    }

    pub fn record_success(&mut self, height: u64) {
        self.entries.insert(height, HeightStatus::Succeeded);
        self.advance();
    }

    /// Charge one attempt to `height` and return its new status
    pub fn record_failure(&mut self, height: u64, error: &str, retryable: bool) -> HeightStatus {
        let attempts = self.entries.get(&height).map_or(0, HeightStatus::attempts) + 1;
        let status = if retryable && attempts < self.max_attempts {
            HeightStatus::Failed {
                attempts,
                retryable,
                last_error: error.to_string(),
            }
        } else {
            if self.recent_abandoned.len() == RECENT_ABANDONED {
                self.recent_abandoned.pop_front();
            }
            self.recent_abandoned.push_back(height);
            self.abandoned_total += 1;
            HeightStatus::Abandoned {
                attempts,
                last_error: error.to_string(),
            }
        };
        self.entries.insert(height, status.clone());
        self.advance();
        status
    }

    fn advance(&mut self) {
        while self
            .entries
            .get(&self.next_height)
            .is_some_and(HeightStatus::is_settled)
        {
            self.entries.remove(&self.next_height);
            self.next_height += 1;
        }
    }
}
