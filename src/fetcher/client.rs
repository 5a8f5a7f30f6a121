use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::errors::{FetchError, FetchResult};
use crate::fetcher::RateLimiter;

/// Source of chain tip heights and raw blocks
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current best block height
    async fn tip_height(&self) -> FetchResult<u64>;

    /// Complete serialised block at `height`, hex encoded
    async fn raw_block_hex(&self, height: u64) -> FetchResult<String>;
}

/// HTTP block provider client
///
/// Every request first takes a slot from the shared [`RateLimiter`]; a
/// refused slot surfaces as [`FetchError::RateLimited`] without touching the
/// network.
pub struct BlockFetcher {
    http: reqwest::Client,
    config: ProviderConfig,
    limiter: Arc<RateLimiter>,
    request_count: AtomicU64,
    error_count: AtomicU64,
}

impl BlockFetcher {
    pub fn new(config: ProviderConfig, limiter: Arc<RateLimiter>) -> FetchResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            limiter,
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn tip_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.tip_path.trim_start_matches('/')
        )
    }

    pub fn block_url(&self, height: u64) -> String {
        format!(
            "{}/rawblock/{}?format=hex",
            self.config.base_url.trim_end_matches('/'),
            height
        )
    }

    /// Requests that reached the network
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn get_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// GET `url` under the rate limiter and return the body text.
    ///
    /// `height` turns a 404 into [`FetchError::NotFound`].
    async fn get_text(&self, url: &str, height: Option<u64>) -> FetchResult<String> {
        self.limiter.try_acquire()?;
        self.request_count.fetch_add(1, Ordering::Relaxed);
        debug!("GET {}", url);

        let result = self.send(url, height).await;
        if let Err(e) = &result {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            warn!("Request to {} failed: {}", url, e);
        }
        result
    }

    async fn send(&self, url: &str, height: Option<u64>) -> FetchResult<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(height) = height {
                return Err(FetchError::NotFound { height });
            }
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e, url))
    }

    fn map_transport_error(&self, err: reqwest::Error, url: &str) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                timeout_seconds: self.config.timeout_seconds,
                url: url.to_string(),
            }
        } else if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ChainSource for BlockFetcher {
    async fn tip_height(&self) -> FetchResult<u64> {
        let body = self.get_text(&self.tip_url(), None).await?;
        parse_tip_height(&body)
    }

    async fn raw_block_hex(&self, height: u64) -> FetchResult<String> {
        let body = self.get_text(&self.block_url(height), Some(height)).await?;
        validate_block_hex(body)
    }
}

/// Accept either a bare integer body or a JSON object with a `height` field
pub fn parse_tip_height(body: &str) -> FetchResult<u64> {
    let body = body.trim();
    if let Ok(height) = body.parse::<u64>() {
        return Ok(height);
    }

    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("height").and_then(serde_json::Value::as_u64))
        .ok_or_else(|| {
            let preview: String = body.chars().take(64).collect();
            FetchError::InvalidResponse(format!("Unrecognised tip height response: {}", preview))
        })
}

/// Trim the body and reject anything that cannot be block hex
pub fn validate_block_hex(body: String) -> FetchResult<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidResponse("Empty block body".to_string()));
    }
    if trimmed.len() % 2 != 0 || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FetchError::InvalidResponse(
            "Block body is not a hex string".to_string(),
        ));
    }
    if trimmed.len() == body.len() {
        Ok(body)
    } else {
        Ok(trimmed.to_string())
    }
}
