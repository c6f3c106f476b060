//! Provider gateways
//!
//! A gateway wraps one provider client with the full resilience chain:
//! cache lookup, then circuit breaker, then retry, then the provider
//! call itself, then cache write-back. The breaker sits outside the
//! retry loop so that a burst of retried failures counts as one fire.

pub mod completion;
pub mod search;

pub use completion::CompletionGateway;
pub use search::SearchGateway;

use crate::core::cache::{CacheStatsSnapshot, SemanticCache};
use crate::core::key::request_key;
use crate::core::providers::Provider;
use crate::core::recovery::{CircuitBreaker, CircuitReport, CircuitState, RetryExecutor};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Generic resilient wrapper around one provider
pub struct ProviderGateway<P: Provider> {
    name: String,
    provider: Arc<P>,
    cache: Arc<SemanticCache>,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
}

impl<P: Provider> ProviderGateway<P> {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<P>,
        cache: Arc<SemanticCache>,
        breaker: CircuitBreaker,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            cache,
            breaker,
            retry,
        }
    }

    /// Run one request through cache, breaker, and retry.
    ///
    /// Cache hits return without touching the breaker, so a cached answer
    /// stays servable while the provider is down. Successful responses are
    /// written back unless the provider marks them degraded.
    pub async fn execute(&self, request: &P::Request) -> Result<P::Response> {
        let kind = self.provider.kind();
        let key = request_key(self.cache.prefix(kind), &self.provider.key_fields(request));

        if let Some(cached) = self.cache.get::<P::Response>(kind, &key).await {
            debug!(gateway = %self.name, "serving cached response");
            return Ok(cached);
        }

        let response = self
            .breaker
            .call(|| self.retry.call(&self.name, || self.provider.call(request)))
            .await?;

        if self.provider.is_degraded(&response) {
            info!(gateway = %self.name, "degraded response not cached");
        } else {
            self.cache.set(kind, &key, &response, None).await;
        }
        Ok(response)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn circuit_report(&self) -> CircuitReport {
        self.breaker.report()
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats(self.provider.kind())
    }

    /// Reachability probe against the provider, bypassing cache and breaker
    pub async fn ping(&self) -> Result<Duration> {
        self.provider.ping().await
    }
}
