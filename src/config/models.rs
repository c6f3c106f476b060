//! Configuration models for the gateway
//!
//! Every option has a default so a bare `Config::default()` is usable in
//! tests and local development. Defaults are resolved exactly once, at
//! construction of the gateway instances; request-level overrides are merged
//! explicitly by the provider clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_true() -> bool {
    true
}

fn default_op_timeout_ms() -> u64 {
    2_000
}

fn default_completion_prefix() -> String {
    "llm:openai".to_string()
}

fn default_search_prefix() -> String {
    "search:web".to_string()
}

fn default_completion_ttl() -> u64 {
    3_600
}

fn default_search_ttl() -> u64 {
    1_800
}

fn default_breaker_timeout_ms() -> u64 {
    30_000
}

fn default_error_threshold() -> u8 {
    50
}

fn default_reset_timeout_ms() -> u64 {
    30_000
}

fn default_volume_threshold() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2_048
}

fn default_search_base_url() -> String {
    "https://google.serper.dev".to_string()
}

fn default_num_results() -> u32 {
    5
}

fn default_request_timeout_ms() -> u64 {
    25_000
}

fn default_monitor_interval_secs() -> u64 {
    300
}

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Enable the redis backend; when false the cache runs fail-open
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-operation timeout in milliseconds; a hung connection must not
    /// stall requests
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            enabled: true,
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl RedisConfig {
    /// Operation timeout as a Duration
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

/// Per-provider-type cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTypeConfig {
    /// Key prefix, e.g. `llm:openai`
    pub prefix: String,
    /// Default TTL in seconds
    pub ttl_seconds: u64,
    /// Enable caching for this provider type
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CacheTypeConfig {
    /// TTL as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Cache configuration across provider types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Completion provider cache settings
    #[serde(default = "CacheConfig::default_completion")]
    pub completion: CacheTypeConfig,
    /// Search provider cache settings
    #[serde(default = "CacheConfig::default_search")]
    pub search: CacheTypeConfig,
}

impl CacheConfig {
    fn default_completion() -> CacheTypeConfig {
        CacheTypeConfig {
            prefix: default_completion_prefix(),
            ttl_seconds: default_completion_ttl(),
            enabled: true,
        }
    }

    fn default_search() -> CacheTypeConfig {
        CacheTypeConfig {
            prefix: default_search_prefix(),
            ttl_seconds: default_search_ttl(),
            enabled: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            completion: Self::default_completion(),
            search: Self::default_search(),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Per-call timeout in milliseconds; exceeding it counts as a failure
    #[serde(default = "default_breaker_timeout_ms")]
    pub timeout_ms: u64,
    /// Failure percentage over the rolling window that opens the circuit
    #[serde(default = "default_error_threshold")]
    pub error_threshold_percentage: u8,
    /// Time the circuit stays open before admitting a trial call
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,
    /// Minimum calls in the window before the failure rate is considered
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: u32,
    /// Rolling statistics window in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_breaker_timeout_ms(),
            error_threshold_percentage: default_error_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            volume_threshold: default_volume_threshold(),
            window_ms: default_window_ms(),
        }
    }
}

impl BreakerConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reset timeout as a Duration
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Rolling window as a Duration
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Add ±10% jitter to backoff delays
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Base delay as a Duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum delay as a Duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API key
    #[serde(default)]
    pub api_key: String,
    /// API base URL
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    /// Default model, overridable per request
    #[serde(default = "default_model")]
    pub model: String,
    /// Default sampling temperature, overridable per request
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Default completion budget, overridable per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// HTTP request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_completion_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API key
    #[serde(default)]
    pub api_key: String,
    /// API base URL
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Default result count, overridable per request
    #[serde(default = "default_num_results")]
    pub num_results: u32,
    /// HTTP request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_search_base_url(),
            num_results: default_num_results(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between scheduled health sweeps in seconds
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
        }
    }
}

impl MonitorConfig {
    /// Sweep interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
