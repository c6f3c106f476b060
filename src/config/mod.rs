//! Configuration management for the gateway
//!
//! Configuration is loaded from a YAML file and/or environment variables,
//! validated once, and then resolved into the gateway instances at startup.
//! Nothing re-reads configuration at call time.

pub mod models;

pub use models::{
    BreakerConfig, CacheConfig, CacheTypeConfig, CompletionConfig, MonitorConfig, RedisConfig,
    RetryConfig, SearchConfig,
};

use crate::utils::error::{GatewayError, Result};
use std::env;
use std::path::Path;
use tracing::{debug, info};

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Redis cache backend
    #[serde(default)]
    pub redis: RedisConfig,
    /// Per-provider-type cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Circuit breaker settings, shared by both providers
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Retry settings, shared by both providers
    #[serde(default)]
    pub retry: RetryConfig,
    /// Completion provider
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Search provider
    #[serde(default)]
    pub search: SearchConfig,
    /// Scheduled health monitoring
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables, on top of defaults
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Config::default();

        if let Ok(url) = env::var("PROCGATE_REDIS_URL") {
            config.redis.url = url;
        }
        if let Ok(enabled) = env::var("PROCGATE_REDIS_ENABLED") {
            config.redis.enabled = parse_bool(&enabled);
        }
        if let Ok(key) = env::var("PROCGATE_COMPLETION_API_KEY") {
            config.completion.api_key = key;
        }
        if let Ok(url) = env::var("PROCGATE_COMPLETION_BASE_URL") {
            config.completion.base_url = url;
        }
        if let Ok(model) = env::var("PROCGATE_COMPLETION_MODEL") {
            config.completion.model = model;
        }
        if let Ok(key) = env::var("PROCGATE_SEARCH_API_KEY") {
            config.search.api_key = key;
        }
        if let Ok(url) = env::var("PROCGATE_SEARCH_BASE_URL") {
            config.search.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.breaker.error_threshold_percentage > 100 {
            return Err(GatewayError::Config(
                "breaker.error_threshold_percentage must be 0-100".to_string(),
            ));
        }
        if self.breaker.timeout_ms == 0 {
            return Err(GatewayError::Config(
                "breaker.timeout_ms must be positive".to_string(),
            ));
        }
        if self.breaker.window_ms == 0 {
            return Err(GatewayError::Config(
                "breaker.window_ms must be positive".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(GatewayError::Config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        for (name, cache) in [
            ("cache.completion", &self.cache.completion),
            ("cache.search", &self.cache.search),
        ] {
            if cache.prefix.is_empty() {
                return Err(GatewayError::Config(format!(
                    "{}.prefix must not be empty",
                    name
                )));
            }
            if cache.prefix.contains(char::is_whitespace) {
                return Err(GatewayError::Config(format!(
                    "{}.prefix must not contain whitespace",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
