//! Networked semantic cache with fail-open semantics
//!
//! One cache instance serves every provider type, each with its own key
//! prefix, TTL, and enabled flag. The backend being unreachable, disabled,
//! or erroring never surfaces to callers: reads degrade to misses, writes
//! become silent no-ops, and the failure is recorded in per-type stats.

pub mod backend;
pub mod types;
#[cfg(test)]
mod tests;

pub use backend::{CacheBackend, MemoryBackend, RedisBackend};
pub use types::{CacheHealth, CacheHealthStatus, CacheStatsSnapshot};

use crate::config::{CacheConfig, CacheTypeConfig};
use crate::core::providers::ProviderKind;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use types::TypeStats;

/// TTL-based key/value cache scoped by provider type
pub struct SemanticCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    stats: DashMap<ProviderKind, TypeStats>,
}

impl SemanticCache {
    /// Create a cache over the given backend
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        let stats = DashMap::new();
        stats.insert(ProviderKind::Completion, TypeStats::default());
        stats.insert(ProviderKind::Search, TypeStats::default());
        Self {
            backend,
            config,
            stats,
        }
    }

    /// Configuration for one provider type
    pub fn type_config(&self, kind: ProviderKind) -> &CacheTypeConfig {
        match kind {
            ProviderKind::Completion => &self.config.completion,
            ProviderKind::Search => &self.config.search,
        }
    }

    /// Key prefix for one provider type
    pub fn prefix(&self, kind: ProviderKind) -> &str {
        &self.type_config(kind).prefix
    }

    fn count(&self, kind: ProviderKind, f: impl Fn(&TypeStats)) {
        if let Some(stats) = self.stats.get(&kind) {
            f(&stats);
        }
    }

    /// Look up a cached value.
    ///
    /// Disabled types, backend failures, and undecodable payloads all read
    /// as misses; only the stats distinguish them.
    pub async fn get<T: DeserializeOwned>(&self, kind: ProviderKind, key: &str) -> Option<T> {
        if !self.type_config(kind).enabled {
            self.count(kind, |s| {
                s.misses.fetch_add(1, Ordering::Relaxed);
            });
            return None;
        }

        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.count(kind, |s| {
                        s.hits.fetch_add(1, Ordering::Relaxed);
                    });
                    debug!(provider = %kind, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(provider = %kind, "discarding undecodable cache entry: {}", e);
                    self.count(kind, |s| {
                        s.errors.fetch_add(1, Ordering::Relaxed);
                        s.misses.fetch_add(1, Ordering::Relaxed);
                    });
                    let _ = self.backend.delete(key).await;
                    None
                }
            },
            Ok(None) => {
                self.count(kind, |s| {
                    s.misses.fetch_add(1, Ordering::Relaxed);
                });
                debug!(provider = %kind, "cache miss");
                None
            }
            Err(e) => {
                debug!(provider = %kind, "cache unavailable, treating as miss: {}", e);
                self.count(kind, |s| {
                    s.errors.fetch_add(1, Ordering::Relaxed);
                    s.misses.fetch_add(1, Ordering::Relaxed);
                });
                None
            }
        }
    }

    /// Store a value. Never fails; backend errors are absorbed into stats.
    pub async fn set<T: Serialize>(
        &self,
        kind: ProviderKind,
        key: &str,
        value: &T,
        ttl_override: Option<Duration>,
    ) {
        if !self.type_config(kind).enabled {
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(provider = %kind, "failed to serialize cache value: {}", e);
                self.count(kind, |s| {
                    s.errors.fetch_add(1, Ordering::Relaxed);
                });
                return;
            }
        };

        let ttl = ttl_override.unwrap_or_else(|| self.type_config(kind).ttl());
        match self.backend.set(key, &raw, ttl).await {
            Ok(()) => {
                self.count(kind, |s| {
                    s.sets.fetch_add(1, Ordering::Relaxed);
                });
            }
            Err(e) => {
                debug!(provider = %kind, "cache write dropped: {}", e);
                self.count(kind, |s| {
                    s.errors.fetch_add(1, Ordering::Relaxed);
                });
            }
        }
    }

    /// Check for a key; unavailable backends read as absent
    pub async fn has(&self, kind: ProviderKind, key: &str) -> bool {
        if !self.type_config(kind).enabled {
            return false;
        }
        self.backend.exists(key).await.unwrap_or(false)
    }

    /// Delete a key, reporting whether it existed
    pub async fn delete(&self, kind: ProviderKind, key: &str) -> bool {
        self.backend.delete(key).await.unwrap_or(false)
    }

    /// Delete every key under a provider type's prefix, returning the count
    /// removed (0 when the backend is unavailable)
    pub async fn invalidate_type(&self, kind: ProviderKind) -> u64 {
        let prefix = format!("{}:", self.prefix(kind));
        match self.backend.delete_prefix(&prefix).await {
            Ok(count) => {
                debug!(provider = %kind, count, "invalidated cache entries");
                count
            }
            Err(e) => {
                warn!(provider = %kind, "invalidate_type skipped, cache unavailable: {}", e);
                0
            }
        }
    }

    /// Probe the backend and report health
    pub async fn health_check(&self) -> CacheHealth {
        let started = Instant::now();
        let status = match self.backend.ping().await {
            Ok(()) => CacheHealthStatus::Healthy,
            Err(_) => CacheHealthStatus::Unhealthy,
        };
        CacheHealth {
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            connected: self.backend.connected(),
        }
    }

    /// Stats snapshot for one provider type
    pub fn stats(&self, kind: ProviderKind) -> CacheStatsSnapshot {
        self.stats
            .get(&kind)
            .map(|s| s.snapshot())
            .unwrap_or(CacheStatsSnapshot {
                hits: 0,
                misses: 0,
                sets: 0,
                errors: 0,
                hit_rate: 0.0,
            })
    }

    /// Stats snapshot for every provider type, including quiet ones
    pub fn stats_all(&self) -> HashMap<ProviderKind, CacheStatsSnapshot> {
        [ProviderKind::Completion, ProviderKind::Search]
            .into_iter()
            .map(|kind| (kind, self.stats(kind)))
            .collect()
    }
}
