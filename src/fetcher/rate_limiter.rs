//! Request budget enforcement
//!
//! A [`RateLimiter`] is constructed from a [`RateLimitConfig`] and shared by
//! reference (usually an `Arc`) between every caller that talks to the
//! provider. Requests over budget are refused immediately with
//! [`FetchError::RateLimited`]; nothing blocks or queues.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RateLimitConfig;
use crate::errors::{FetchError, FetchResult};

#[derive(Debug, Default)]
struct LimiterState {
    /// Grant times inside the current window, oldest first
    granted: VecDeque<Instant>,
    last_grant: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Take one request slot now
    pub fn try_acquire(&self) -> FetchResult<()> {
        self.try_acquire_at(Instant::now())
    }

    /// Take one request slot at `now`.
    ///
    /// The check and the grant happen under one lock, so concurrent callers
    /// can never exceed the budget together.
    pub fn try_acquire_at(&self, now: Instant) -> FetchResult<()> {
        let window = self.config.window();
        let min_interval = self.config.min_interval();
        let mut state = self.lock();

        while let Some(&oldest) = state.granted.front() {
            if now.saturating_duration_since(oldest) >= window {
                state.granted.pop_front();
            } else {
                break;
            }
        }

        if let Some(last) = state.last_grant {
            let since_last = now.saturating_duration_since(last);
            if since_last < min_interval {
                let retry_after = min_interval - since_last;
                debug!("Rate limiter: min interval not elapsed, retry in {:?}", retry_after);
                return Err(FetchError::RateLimited { retry_after });
            }
        }

        if state.granted.len() >= self.config.max_requests as usize {
            let retry_after = state
                .granted
                .front()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(window);
            debug!(
                "Rate limiter: {} requests in window, retry in {:?}",
                state.granted.len(),
                retry_after
            );
            return Err(FetchError::RateLimited { retry_after });
        }

        state.granted.push_back(now);
        state.last_grant = Some(now);
        Ok(())
    }

    /// Slots left in the current window as of `now`
    pub fn remaining_at(&self, now: Instant) -> u32 {
        let window = self.config.window();
        let state = self.lock();
        let used = state
            .granted
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < window)
            .count() as u32;
        self.config.max_requests.saturating_sub(used)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_at(Instant::now())
    }

    /// Delay until the minimum spacing allows another request
    pub fn time_until_next(&self, now: Instant) -> Duration {
        let state = self.lock();
        state
            .last_grant
            .map(|last| {
                self.config
                    .min_interval()
                    .saturating_sub(now.saturating_duration_since(last))
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // The state stays consistent even if a holder panicked
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
