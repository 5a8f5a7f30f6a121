use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::decoder::{DecodeOptions, TxFailurePolicy};
use crate::errors::{AppError, AppResult};

/// Environment variable prefix, e.g. `WITNESS_SCAN_PROVIDER__BASE_URL`
pub const ENV_PREFIX: &str = "WITNESS_SCAN";

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub rate_limit: RateLimitConfig,
    pub ingest: IngestConfig,
    pub decoder: DecoderConfig,
}

/// External block provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Path (relative to `base_url`) answering with the current tip height
    pub tip_path: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://blockchain.info".to_string(),
            tip_path: "q/getblockcount".to_string(),
            timeout_seconds: 60,
            user_agent: concat!("witness-scan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Request budget shared by every provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per rolling window
    pub max_requests: u32,
    pub window_seconds: u64,
    /// Minimum spacing between consecutive requests
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_seconds: 3600,
            min_interval_ms: 1000,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Block ingest loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub poll_interval_seconds: u64,
    /// First height to ingest; the chain tip at startup when unset
    #[serde(default)]
    pub start_height: Option<u64>,
    pub max_blocks_per_tick: usize,
    /// Attempts per height before it is abandoned
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
    /// Directory for extracted content; nothing is written when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
            start_height: None,
            max_blocks_per_tick: 10,
            max_retries: 5,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_seconds: 300,
            output_dir: None,
        }
    }
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub tx_failure_policy: TxFailurePolicy,
    pub extract_content: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            tx_failure_policy: TxFailurePolicy::AbortBlock,
            extract_content: true,
        }
    }
}

impl DecoderConfig {
    pub fn options(&self) -> DecodeOptions {
        DecodeOptions {
            tx_failure_policy: self.tx_failure_policy,
            extract_content: self.extract_content,
        }
    }
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables
    /// Environment variables take precedence over file configuration
    pub fn load() -> AppResult<Self> {
        let defaults = AppConfig::default();
        let config = Config::builder()
            // Start with default values
            .set_default("provider.base_url", defaults.provider.base_url)?
            .set_default("provider.tip_path", defaults.provider.tip_path)?
            .set_default("provider.timeout_seconds", defaults.provider.timeout_seconds)?
            .set_default("provider.user_agent", defaults.provider.user_agent)?
            .set_default(
                "rate_limit.max_requests",
                i64::from(defaults.rate_limit.max_requests),
            )?
            .set_default("rate_limit.window_seconds", defaults.rate_limit.window_seconds)?
            .set_default(
                "rate_limit.min_interval_ms",
                defaults.rate_limit.min_interval_ms,
            )?
            .set_default(
                "ingest.poll_interval_seconds",
                defaults.ingest.poll_interval_seconds,
            )?
            .set_default(
                "ingest.max_blocks_per_tick",
                defaults.ingest.max_blocks_per_tick as i64,
            )?
            .set_default("ingest.max_retries", i64::from(defaults.ingest.max_retries))?
            .set_default("ingest.initial_backoff_ms", defaults.ingest.initial_backoff_ms)?
            .set_default("ingest.backoff_multiplier", defaults.ingest.backoff_multiplier)?
            .set_default(
                "ingest.max_backoff_seconds",
                defaults.ingest.max_backoff_seconds,
            )?
            .set_default("decoder.tx_failure_policy", "abort_block")?
            .set_default("decoder.extract_content", defaults.decoder.extract_content)?
            // Load from config.toml if it exists
            .add_source(File::with_name("config").required(false))
            // WITNESS_SCAN_<SECTION>__<KEY> overrides, e.g. WITNESS_SCAN_INGEST__START_HEIGHT
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Get config values for CLI argument defaults, falling back to built-ins
    pub fn get_defaults() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Reject budgets and intervals that would stall or spin the loop
    pub fn validate(&self) -> AppResult<()> {
        if self.provider.base_url.trim().is_empty() {
            return Err(AppError::Config("provider.base_url is empty".to_string()));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0 {
            return Err(AppError::Config(
                "rate_limit.max_requests and rate_limit.window_seconds must be non-zero"
                    .to_string(),
            ));
        }
        if self.ingest.poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "ingest.poll_interval_seconds must be non-zero".to_string(),
            ));
        }
        if self.ingest.max_blocks_per_tick == 0 || self.ingest.max_retries == 0 {
            return Err(AppError::Config(
                "ingest.max_blocks_per_tick and ingest.max_retries must be non-zero".to_string(),
            ));
        }
        if self.ingest.backoff_multiplier < 1.0 {
            return Err(AppError::Config(
                "ingest.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}
