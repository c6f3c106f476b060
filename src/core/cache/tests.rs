//! Semantic cache tests over the in-memory backend

use super::backend::MemoryBackend;
use super::{CacheHealthStatus, SemanticCache};
use crate::config::CacheConfig;
use crate::core::key::request_key;
use crate::core::providers::ProviderKind;
use std::sync::Arc;
use std::time::Duration;

fn cache_with_backend() -> (SemanticCache, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let cache = SemanticCache::new(backend.clone(), CacheConfig::default());
    (cache, backend)
}

// ==================== Correctness Tests ====================

#[tokio::test]
async fn test_set_then_get_before_ttl() {
    let (cache, _) = cache_with_backend();
    let key = request_key(cache.prefix(ProviderKind::Completion), &["prompt".into()]);

    cache
        .set(ProviderKind::Completion, &key, &"stored".to_string(), None)
        .await;
    let value: Option<String> = cache.get(ProviderKind::Completion, &key).await;
    assert_eq!(value, Some("stored".to_string()));
}

#[tokio::test]
async fn test_get_after_ttl_expiry() {
    let (cache, _) = cache_with_backend();
    let key = request_key(cache.prefix(ProviderKind::Completion), &["prompt".into()]);

    cache
        .set(
            ProviderKind::Completion,
            &key,
            &"stored".to_string(),
            Some(Duration::from_millis(20)),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let value: Option<String> = cache.get(ProviderKind::Completion, &key).await;
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_has_and_delete() {
    let (cache, _) = cache_with_backend();
    let key = request_key(cache.prefix(ProviderKind::Search), &["q".into()]);

    assert!(!cache.has(ProviderKind::Search, &key).await);
    cache
        .set(ProviderKind::Search, &key, &"v".to_string(), None)
        .await;
    assert!(cache.has(ProviderKind::Search, &key).await);
    assert!(cache.delete(ProviderKind::Search, &key).await);
    assert!(!cache.has(ProviderKind::Search, &key).await);
}

#[tokio::test]
async fn test_undecodable_entry_reads_as_miss_and_is_evicted() {
    let (cache, backend) = cache_with_backend();
    let key = request_key(cache.prefix(ProviderKind::Completion), &["p".into()]);

    use super::backend::CacheBackend;
    backend
        .set(&key, "not json {{", Duration::from_secs(60))
        .await
        .unwrap();

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Typed {
        content: String,
    }
    let value: Option<Typed> = cache.get(ProviderKind::Completion, &key).await;
    assert!(value.is_none());
    assert!(!backend.exists(&key).await.unwrap());

    let stats = cache.stats(ProviderKind::Completion);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.misses, 1);
}

// ==================== Fail-open Tests ====================

#[tokio::test]
async fn test_fail_open_get_and_set() {
    let (cache, backend) = cache_with_backend();
    backend.set_failing(true);

    let key = request_key(cache.prefix(ProviderKind::Completion), &["p".into()]);
    // get never errors, set never panics or errors
    let value: Option<String> = cache.get(ProviderKind::Completion, &key).await;
    assert_eq!(value, None);
    cache
        .set(ProviderKind::Completion, &key, &"v".to_string(), None)
        .await;

    let stats = cache.stats(ProviderKind::Completion);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.sets, 0);
}

#[tokio::test]
async fn test_recovery_after_backend_returns() {
    let (cache, backend) = cache_with_backend();
    let key = request_key(cache.prefix(ProviderKind::Completion), &["p".into()]);

    backend.set_failing(true);
    let miss: Option<String> = cache.get(ProviderKind::Completion, &key).await;
    assert!(miss.is_none());

    // No caller-visible reconnect step: the next call just works
    backend.set_failing(false);
    cache
        .set(ProviderKind::Completion, &key, &"v".to_string(), None)
        .await;
    let hit: Option<String> = cache.get(ProviderKind::Completion, &key).await;
    assert_eq!(hit, Some("v".to_string()));
}

#[tokio::test]
async fn test_disabled_type_counts_misses_and_drops_writes() {
    let backend = Arc::new(MemoryBackend::new());
    let mut config = CacheConfig::default();
    config.completion.enabled = false;
    let cache = SemanticCache::new(backend.clone(), config);

    let key = "llm:openai:abc";
    cache
        .set(ProviderKind::Completion, key, &"v".to_string(), None)
        .await;
    let value: Option<String> = cache.get(ProviderKind::Completion, key).await;
    assert!(value.is_none());

    let stats = cache.stats(ProviderKind::Completion);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.sets, 0);
}

// ==================== Stats Tests ====================

#[tokio::test]
async fn test_stats_isolated_per_type() {
    let (cache, backend) = cache_with_backend();

    // Searches fail while completions work
    cache
        .set(ProviderKind::Completion, "llm:openai:k", &"v".to_string(), None)
        .await;
    let _: Option<String> = cache.get(ProviderKind::Completion, "llm:openai:k").await;

    backend.set_failing(true);
    let _: Option<String> = cache.get(ProviderKind::Search, "search:web:k").await;
    backend.set_failing(false);

    let completion = cache.stats(ProviderKind::Completion);
    assert_eq!(completion.hits, 1);
    assert_eq!(completion.errors, 0);

    let search = cache.stats(ProviderKind::Search);
    assert_eq!(search.hits, 0);
    assert_eq!(search.errors, 1);
    assert_eq!(search.misses, 1);
}

#[tokio::test]
async fn test_hit_rate() {
    let (cache, _) = cache_with_backend();
    cache
        .set(ProviderKind::Completion, "llm:openai:k", &"v".to_string(), None)
        .await;

    let _: Option<String> = cache.get(ProviderKind::Completion, "llm:openai:k").await;
    let _: Option<String> = cache.get(ProviderKind::Completion, "llm:openai:other").await;

    let stats = cache.stats(ProviderKind::Completion);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_stats_all_covers_every_type() {
    let (cache, _) = cache_with_backend();
    let _: Option<String> = cache.get(ProviderKind::Completion, "llm:openai:k").await;

    let all = cache.stats_all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[&ProviderKind::Completion].misses, 1);
    // Types with no traffic still report a zeroed snapshot
    assert_eq!(all[&ProviderKind::Search].misses, 0);
    assert_eq!(all[&ProviderKind::Search].hit_rate, 0.0);
}

// ==================== Invalidation Tests ====================

#[tokio::test]
async fn test_invalidate_type_counts_and_clears() {
    let (cache, _) = cache_with_backend();

    let mut keys = Vec::new();
    for i in 0..5 {
        let key = request_key(
            cache.prefix(ProviderKind::Completion),
            &[format!("prompt {}", i)],
        );
        cache
            .set(ProviderKind::Completion, &key, &"v".to_string(), None)
            .await;
        keys.push(key);
    }
    let search_key = request_key(cache.prefix(ProviderKind::Search), &["q".into()]);
    cache
        .set(ProviderKind::Search, &search_key, &"v".to_string(), None)
        .await;

    assert_eq!(cache.invalidate_type(ProviderKind::Completion).await, 5);
    for key in &keys {
        let value: Option<String> = cache.get(ProviderKind::Completion, key).await;
        assert!(value.is_none());
    }
    // The other type's entries survive
    assert!(cache.has(ProviderKind::Search, &search_key).await);
}

#[tokio::test]
async fn test_invalidate_type_unavailable_returns_zero() {
    let (cache, backend) = cache_with_backend();
    backend.set_failing(true);
    assert_eq!(cache.invalidate_type(ProviderKind::Completion).await, 0);
}

// ==================== Health Tests ====================

#[tokio::test]
async fn test_health_check_reports_status() {
    let (cache, backend) = cache_with_backend();

    let health = cache.health_check().await;
    assert_eq!(health.status, CacheHealthStatus::Healthy);
    assert!(health.connected);

    backend.set_failing(true);
    let health = cache.health_check().await;
    assert_eq!(health.status, CacheHealthStatus::Unhealthy);
    assert!(!health.connected);
}
