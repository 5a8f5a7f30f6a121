//! In-memory chain source for tests and offline runs.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{FetchError, FetchResult};
use crate::fetcher::ChainSource;

#[derive(Debug, Default)]
struct MockState {
    tip: u64,
    blocks: HashMap<u64, String>,
    /// One-shot failures returned before the block is served
    block_failures: HashMap<u64, VecDeque<FetchError>>,
    tip_failures: VecDeque<FetchError>,
    block_requests: Vec<u64>,
    tip_requests: u64,
}

/// Chain source serving pre-loaded block hex
#[derive(Debug, Default)]
pub struct MockChainSource {
    state: Mutex<MockState>,
}

impl MockChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block and raise the tip to at least `height`
    pub fn add_block(&self, height: u64, block_hex: impl Into<String>) {
        let mut state = self.state.lock();
        state.blocks.insert(height, block_hex.into());
        state.tip = state.tip.max(height);
    }

    pub fn set_tip(&self, height: u64) {
        self.state.lock().tip = height;
    }

    /// Fail the next request for `height` with `error`
    pub fn fail_block_once(&self, height: u64, error: FetchError) {
        self.state
            .lock()
            .block_failures
            .entry(height)
            .or_default()
            .push_back(error);
    }

    /// Fail the next tip query with `error`
    pub fn fail_tip_once(&self, error: FetchError) {
        self.state.lock().tip_failures.push_back(error);
    }

    /// Heights requested so far, in order
    pub fn block_requests(&self) -> Vec<u64> {
        self.state.lock().block_requests.clone()
    }

    pub fn tip_requests(&self) -> u64 {
        self.state.lock().tip_requests
    }
}

#[async_trait]
impl ChainSource for MockChainSource {
    async fn tip_height(&self) -> FetchResult<u64> {
        let mut state = self.state.lock();
        state.tip_requests += 1;
        match state.tip_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(state.tip),
        }
    }

    async fn raw_block_hex(&self, height: u64) -> FetchResult<String> {
        let mut state = self.state.lock();
        state.block_requests.push(height);
        if let Some(err) = state
            .block_failures
            .get_mut(&height)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        state
            .blocks
            .get(&height)
            .cloned()
            .ok_or(FetchError::NotFound { height })
    }
}
