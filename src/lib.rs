//! # ProcGate
//!
//! Resilient gateway to the AI providers behind a procurement-document
//! drafting service. Every outbound call goes through the same chain:
//! a semantic response cache, a circuit breaker, and a bounded retry
//! loop, so provider outages degrade service instead of taking it down.
//!
//! ## Features
//!
//! - **Semantic caching**: deterministic request keys over normalized
//!   prompt text, backed by Redis with per-provider-type TTLs
//! - **Fail-open cache**: an unreachable Redis never blocks a request;
//!   reads degrade to misses and writes become no-ops
//! - **Circuit breaking**: rolling-window error-rate breaker with a
//!   per-call timeout and a single half-open trial
//! - **Bounded retries**: exponential backoff with jitter, driven by
//!   error classification rather than blanket retrying
//! - **Graceful search degradation**: search failures yield an explicit
//!   fallback response so drafting continues without citations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use procgate::{Config, GatewayRuntime};
//! use procgate::core::providers::CompletionRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     procgate::utils::logging::init_logging(false);
//!
//!     let config = Config::from_env()?;
//!     let runtime = GatewayRuntime::new(config)?;
//!     runtime.start_monitoring();
//!
//!     let response = runtime
//!         .completion
//!         .complete(&CompletionRequest {
//!             system_prompt: "You draft procurement documents.".into(),
//!             user_prompt: "Draft a terms of reference outline.".into(),
//!             temperature: None,
//!             max_tokens: None,
//!             model: None,
//!         })
//!         .await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod monitoring;
pub mod utils;

pub use config::Config;
pub use crate::core::cache::SemanticCache;
pub use crate::core::gateway::{CompletionGateway, SearchGateway};
pub use utils::error::{ErrorCategory, GatewayError, Result};

use crate::core::cache::{CacheBackend, RedisBackend};
use crate::core::providers::{CompletionClient, SearchClient};
use crate::core::recovery::{CircuitBreaker, RetryExecutor};
use monitoring::HealthMonitor;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Fully wired gateway stack: shared cache, one gateway per provider
/// type, and a health monitor over all of them.
pub struct GatewayRuntime {
    /// Shared semantic cache
    pub cache: Arc<SemanticCache>,
    /// Completion gateway
    pub completion: Arc<CompletionGateway>,
    /// Search gateway
    pub search: Arc<SearchGateway>,
    /// Health monitor
    pub monitor: Arc<HealthMonitor>,
}

impl GatewayRuntime {
    /// Wire up the whole stack from configuration.
    ///
    /// Each gateway gets its own breaker and retry executor so a search
    /// outage never trips the completion circuit. Must be called inside
    /// a Tokio runtime; the Redis connection is established in the
    /// background.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let backend: Arc<dyn CacheBackend> = Arc::new(RedisBackend::new(config.redis.clone()));
        let cache = Arc::new(SemanticCache::new(backend, config.cache.clone()));

        let completion_client = Arc::new(CompletionClient::new(config.completion.clone())?);
        let completion = Arc::new(CompletionGateway::new(
            completion_client,
            Arc::clone(&cache),
            CircuitBreaker::new("completion", config.breaker.clone()),
            RetryExecutor::new(config.retry.clone()),
        ));

        let search_client = Arc::new(SearchClient::new(config.search.clone())?);
        let search = Arc::new(SearchGateway::new(
            search_client,
            Arc::clone(&cache),
            CircuitBreaker::new("search", config.breaker.clone()),
            RetryExecutor::new(config.retry.clone()),
        ));

        let monitor = Arc::new(HealthMonitor::new(
            config.monitor.clone(),
            Arc::clone(&cache),
            Arc::clone(&completion),
            Arc::clone(&search),
        ));

        Ok(Self {
            cache,
            completion,
            search,
            monitor,
        })
    }

    /// Start the periodic health sweep; drop or abort the handle to stop it
    pub fn start_monitoring(&self) -> JoinHandle<()> {
        Arc::clone(&self.monitor).spawn()
    }
}
