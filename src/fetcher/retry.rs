//! Exponential backoff helpers for provider operations

use std::time::Duration;

/// Calculate next backoff duration using exponential backoff with a maximum cap
///
/// `new_backoff = min(current_backoff * multiplier, max_backoff)`
///
/// # Example
/// ```
/// use std::time::Duration;
/// use witness_scan::fetcher::calculate_next_backoff;
///
/// let backoff = Duration::from_millis(100);
/// let next = calculate_next_backoff(backoff, 2.0, 30);
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
) -> Duration {
    Duration::from_millis((current_backoff.as_millis() as f64 * multiplier) as u64)
        .min(Duration::from_secs(max_backoff_seconds))
}

/// Backoff state that grows on each failure and resets on success
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
}

impl Backoff {
    pub fn new(initial: Duration, multiplier: f64, max_backoff_seconds: u64) -> Self {
        let initial = initial.min(Duration::from_secs(max_backoff_seconds));
        Self {
            initial,
            current: initial,
            multiplier,
            max_backoff_seconds,
        }
    }

    /// Delay to wait now; the following call returns a longer one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = calculate_next_backoff(self.current, self.multiplier, self.max_backoff_seconds);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
