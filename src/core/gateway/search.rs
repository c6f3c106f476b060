//! Search gateway
//!
//! Search is an enrichment, not a hard dependency: any failure past the
//! resilience chain is converted into an empty fallback response with
//! `is_fallback` set, so document generation continues without citations
//! instead of failing outright. Fallback responses are never cached.

use super::ProviderGateway;
use crate::core::cache::{CacheStatsSnapshot, SemanticCache};
use crate::core::providers::{SearchClient, SearchRequest, SearchResponse};
use crate::core::recovery::{CircuitBreaker, CircuitReport, CircuitState, RetryExecutor};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Resilient search entry point
pub struct SearchGateway {
    inner: ProviderGateway<SearchClient>,
}

impl SearchGateway {
    pub fn new(
        client: Arc<SearchClient>,
        cache: Arc<SemanticCache>,
        breaker: CircuitBreaker,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            inner: ProviderGateway::new("search", client, cache, breaker, retry),
        }
    }

    /// Run a search, consulting the cache first. Never fails: errors and
    /// open-circuit rejections yield [`SearchResponse::fallback`].
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        match self.inner.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                let reason = err
                    .category()
                    .map(|c| c.user_message().to_string())
                    .unwrap_or_else(|| err.to_string());
                warn!(query = %request.query, "search degraded to fallback: {}", err);
                SearchResponse::fallback(&reason)
            }
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.inner.circuit_state()
    }

    pub fn circuit_report(&self) -> CircuitReport {
        self.inner.circuit_report()
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.inner.cache_stats()
    }

    pub async fn ping(&self) -> Result<Duration> {
        self.inner.ping().await
    }
}
