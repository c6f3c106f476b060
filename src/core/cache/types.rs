//! Type definitions for the semantic cache

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-provider-type cache counters.
///
/// Updated atomically with every cache operation outcome; counters for one
/// provider type never touch another's.
#[derive(Debug, Default)]
pub(super) struct TypeStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub sets: AtomicU64,
    pub errors: AtomicU64,
}

impl TypeStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate: if hits + misses == 0 {
                0.0
            } else {
                hits as f64 / (hits + misses) as f64
            },
        }
    }
}

/// Point-in-time cache statistics for one provider type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    /// Reads answered from cache
    pub hits: u64,
    /// Reads that fell through to the provider
    pub misses: u64,
    /// Successful writes
    pub sets: u64,
    /// Backend failures absorbed by the fail-open policy
    pub errors: u64,
    /// hits / (hits + misses); 0 when there has been no traffic
    pub hit_rate: f64,
}

/// Cache backend health, as reported to health-check collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHealth {
    /// Overall status
    pub status: CacheHealthStatus,
    /// Probe round-trip latency in milliseconds
    pub latency_ms: u64,
    /// Last observed connection state
    pub connected: bool,
}

/// Cache health status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheHealthStatus {
    /// Backend reachable and answering probes
    Healthy,
    /// Backend unreachable; the cache is running fail-open
    Unhealthy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_zero_without_traffic() {
        let stats = TypeStats::default();
        assert_eq!(stats.snapshot().hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_computed() {
        let stats = TypeStats::default();
        stats.hits.store(3, Ordering::Relaxed);
        stats.misses.store(1, Ordering::Relaxed);
        assert!((stats.snapshot().hit_rate - 0.75).abs() < f64::EPSILON);
    }
}
