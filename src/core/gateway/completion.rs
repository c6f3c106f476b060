//! Completion gateway
//!
//! Completions have no meaningful degraded answer: when the breaker is
//! open the caller gets a hard "service unavailable" failure and is
//! expected to surface it to the user.

use super::ProviderGateway;
use crate::core::cache::{CacheStatsSnapshot, SemanticCache};
use crate::core::providers::{CompletionClient, CompletionRequest, CompletionResponse};
use crate::core::recovery::{CircuitBreaker, CircuitReport, CircuitState, RetryExecutor};
use crate::utils::error::{GatewayError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Resilient completion entry point
pub struct CompletionGateway {
    inner: ProviderGateway<CompletionClient>,
}

impl CompletionGateway {
    pub fn new(
        client: Arc<CompletionClient>,
        cache: Arc<SemanticCache>,
        breaker: CircuitBreaker,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            inner: ProviderGateway::new("completion", client, cache, breaker, retry),
        }
    }

    /// Produce a completion, consulting the cache first.
    ///
    /// An open circuit is reported as [`GatewayError::ServiceUnavailable`];
    /// provider errors pass through with their classification intact.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        match self.inner.execute(request).await {
            Ok(response) => Ok(response),
            Err(GatewayError::CircuitOpen(detail)) => {
                warn!("completion rejected while circuit open: {}", detail);
                Err(GatewayError::ServiceUnavailable(
                    "completion service unavailable".to_string(),
                ))
            }
            Err(err) => Err(err),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BreakerConfig, CacheConfig, CompletionConfig, RetryConfig};
    use crate::core::cache::MemoryBackend;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> CompletionGateway {
        let client = CompletionClient::new(CompletionConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 128,
            request_timeout_ms: 2_000,
        })
        .unwrap();
        let cache = Arc::new(SemanticCache::new(
            Arc::new(MemoryBackend::new()),
            CacheConfig::default(),
        ));
        let breaker = CircuitBreaker::new(
            "completion",
            BreakerConfig {
                timeout_ms: 1_000,
                error_threshold_percentage: 50,
                reset_timeout_ms: 30_000,
                volume_threshold: 2,
                window_ms: 60_000,
            },
        );
        let retry = RetryExecutor::new(RetryConfig {
            max_retries: 0,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: false,
        });
        CompletionGateway::new(Arc::new(client), cache, breaker, retry)
    }

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You draft procurement documents.".to_string(),
            user_prompt: prompt.to_string(),
            temperature: None,
            max_tokens: None,
            model: None,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_provider_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Draft outline."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let response = gateway.complete(&request("outline please")).await.unwrap();
        assert_eq!(response.content, "Draft outline.");
    }

    #[tokio::test]
    async fn test_open_circuit_maps_to_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        for i in 0..2 {
            let err = gateway.complete(&request(&format!("q{}", i))).await.unwrap_err();
            assert!(!matches!(err, GatewayError::ServiceUnavailable(_)));
        }
        assert_eq!(gateway.circuit_state(), CircuitState::Open);

        let err = gateway.complete(&request("q2")).await.unwrap_err();
        assert!(matches!(err, GatewayError::ServiceUnavailable(_)));
    }
}
