//! Scheduled health sweeps over the cache and both gateways
//!
//! The monitor runs on a fixed interval, probing the cache backend and
//! pinging each provider, and logs a warning for anything degraded. The
//! same snapshot is available on demand for a health endpoint.

use crate::config::MonitorConfig;
use crate::core::cache::{CacheHealth, CacheHealthStatus, CacheStatsSnapshot, SemanticCache};
use crate::core::gateway::{CompletionGateway, SearchGateway};
use crate::core::recovery::CircuitReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Health of one gateway at sweep time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayHealth {
    /// Circuit state and rolling stats
    pub circuit: CircuitReport,
    /// Cache counters for this provider type
    pub cache: CacheStatsSnapshot,
    /// Ping round trip in milliseconds, if the provider answered
    pub ping_ms: Option<u64>,
}

impl GatewayHealth {
    fn healthy(&self) -> bool {
        self.circuit.closed && self.ping_ms.is_some()
    }
}

/// Coarse summary of the whole deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Everything answered
    Healthy,
    /// Something is down but the system is still serving
    Degraded,
}

/// One sweep's findings, serializable for a health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub checked_at: DateTime<Utc>,
    pub status: OverallStatus,
    pub cache: CacheHealth,
    pub completion: GatewayHealth,
    pub search: GatewayHealth,
}

/// Periodic health prober
pub struct HealthMonitor {
    config: MonitorConfig,
    cache: Arc<SemanticCache>,
    completion: Arc<CompletionGateway>,
    search: Arc<SearchGateway>,
}

impl HealthMonitor {
    pub fn new(
        config: MonitorConfig,
        cache: Arc<SemanticCache>,
        completion: Arc<CompletionGateway>,
        search: Arc<SearchGateway>,
    ) -> Self {
        Self {
            config,
            cache,
            completion,
            search,
        }
    }

    /// Probe everything once
    pub async fn snapshot(&self) -> HealthSnapshot {
        let cache = self.cache.health_check().await;

        let completion = GatewayHealth {
            circuit: self.completion.circuit_report(),
            cache: self.completion.cache_stats(),
            ping_ms: self
                .completion
                .ping()
                .await
                .ok()
                .map(|d| d.as_millis() as u64),
        };
        let search = GatewayHealth {
            circuit: self.search.circuit_report(),
            cache: self.search.cache_stats(),
            ping_ms: self.search.ping().await.ok().map(|d| d.as_millis() as u64),
        };

        let status = if cache.status == CacheHealthStatus::Healthy
            && completion.healthy()
            && search.healthy()
        {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };

        HealthSnapshot {
            checked_at: Utc::now(),
            status,
            cache,
            completion,
            search,
        }
    }

    /// Start the sweep loop; runs until the handle is aborted or dropped
    /// by the owning runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let snapshot = self.snapshot().await;
                match snapshot.status {
                    OverallStatus::Healthy => {
                        info!(
                            completion_ping_ms = ?snapshot.completion.ping_ms,
                            search_ping_ms = ?snapshot.search.ping_ms,
                            "health sweep: all services healthy"
                        );
                    }
                    OverallStatus::Degraded => {
                        warn!(
                            cache = ?snapshot.cache.status,
                            completion_open = snapshot.completion.circuit.opened,
                            search_open = snapshot.search.circuit.opened,
                            "health sweep: degraded"
                        );
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BreakerConfig, CacheConfig, CompletionConfig, MonitorConfig, RetryConfig, SearchConfig,
    };
    use crate::core::cache::MemoryBackend;
    use crate::core::providers::{CompletionClient, SearchClient};
    use crate::core::recovery::{CircuitBreaker, RetryExecutor};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn monitor_for(
        completion_server: &MockServer,
        search_server: &MockServer,
    ) -> HealthMonitor {
        let cache = Arc::new(SemanticCache::new(
            Arc::new(MemoryBackend::new()),
            CacheConfig::default(),
        ));
        let retry = RetryConfig {
            max_retries: 0,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: false,
        };

        let completion_client = CompletionClient::new(CompletionConfig {
            api_key: "k".to_string(),
            base_url: completion_server.uri(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 64,
            request_timeout_ms: 2_000,
        })
        .unwrap();
        let completion = Arc::new(CompletionGateway::new(
            Arc::new(completion_client),
            cache.clone(),
            CircuitBreaker::new("completion", BreakerConfig::default()),
            RetryExecutor::new(retry.clone()),
        ));

        let search_client = SearchClient::new(SearchConfig {
            api_key: "k".to_string(),
            base_url: search_server.uri(),
            num_results: 3,
            request_timeout_ms: 2_000,
        })
        .unwrap();
        let search = Arc::new(SearchGateway::new(
            Arc::new(search_client),
            cache.clone(),
            CircuitBreaker::new("search", BreakerConfig::default()),
            RetryExecutor::new(retry),
        ));

        HealthMonitor::new(MonitorConfig::default(), cache, completion, search)
    }

    #[tokio::test]
    async fn test_snapshot_healthy_when_all_answer() {
        let completion_server = MockServer::start().await;
        let search_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&completion_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic": []})))
            .mount(&search_server)
            .await;

        let monitor = monitor_for(&completion_server, &search_server).await;
        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.status, OverallStatus::Healthy);
        assert!(snapshot.completion.ping_ms.is_some());
        assert!(snapshot.search.ping_ms.is_some());
    }

    #[tokio::test]
    async fn test_snapshot_degraded_when_provider_down() {
        let completion_server = MockServer::start().await;
        let search_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&completion_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&search_server)
            .await;

        let monitor = monitor_for(&completion_server, &search_server).await;
        let snapshot = monitor.snapshot().await;
        assert_eq!(snapshot.status, OverallStatus::Degraded);
        assert!(snapshot.search.ping_ms.is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = HealthSnapshot {
            checked_at: Utc::now(),
            status: OverallStatus::Healthy,
            cache: CacheHealth {
                status: CacheHealthStatus::Healthy,
                latency_ms: 1,
                connected: true,
            },
            completion: GatewayHealth {
                circuit: crate::core::recovery::CircuitReport::default(),
                cache: CacheStatsSnapshot::default(),
                ping_ms: Some(12),
            },
            search: GatewayHealth {
                circuit: crate::core::recovery::CircuitReport::default(),
                cache: CacheStatsSnapshot::default(),
                ping_ms: None,
            },
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["completion"]["ping_ms"], 12);
    }
}
