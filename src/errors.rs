use std::time::Duration;
use thiserror::Error;

use crate::decoder::DecodeError;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Structural block/transaction decoding failures
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Block provider operations
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Content persistence
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Block provider error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Request refused locally because the request budget is spent
    #[error("Rate limited: retry in {}ms", retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    /// Provider does not have this block (terminal)
    #[error("Block not found at height {height}")]
    NotFound { height: u64 },

    /// Non-success HTTP status other than 404
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Request timed out
    #[error("Request timeout after {timeout_seconds}s: {url}")]
    Timeout { timeout_seconds: u64, url: String },

    /// Connection or transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider returned a body we cannot use (terminal)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Whether the same request may succeed on a later cycle
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RateLimited { .. }
            | FetchError::Timeout { .. }
            | FetchError::Transport(_) => true,
            FetchError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            FetchError::NotFound { .. } | FetchError::InvalidResponse(_) => false,
        }
    }
}

/// Content sink error types
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sink rejected block {height}: {message}")]
    Rejected { height: u64, message: String },
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for provider operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
