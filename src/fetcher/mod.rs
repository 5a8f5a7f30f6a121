//! Block provider integration
//!
//! - **Client** - HTTP [`BlockFetcher`] implementing [`ChainSource`]
//! - **Rate limiter** - shared request budget, injected into every client
//! - **Retry** - exponential backoff helpers
//! - **Mock** - in-memory [`ChainSource`] for tests

pub mod client;
pub mod mock;
pub mod rate_limiter;
pub mod retry;

pub use client::{parse_tip_height, BlockFetcher, ChainSource};
pub use mock::MockChainSource;
pub use rate_limiter::RateLimiter;
pub use retry::{calculate_next_backoff, Backoff};
