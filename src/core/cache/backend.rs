//! Cache backend implementations
//!
//! [`RedisBackend`] is the production backend: a multiplexed async
//! connection established lazily in the background, with every operation
//! bounded by a short timeout so a hung connection cannot stall requests.
//! [`MemoryBackend`] is an in-process TTL map used by tests and by
//! deployments that run without redis.

use crate::config::RedisConfig;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Key/value store with TTL semantics.
///
/// Implementations report failures; the fail-open policy (errors become
/// misses and no-ops) lives in [`super::SemanticCache`], not here.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Store a value with a TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    /// Check for a key without fetching it
    async fn exists(&self, key: &str) -> Result<bool>;
    /// Delete a key, reporting whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;
    /// Delete every key under a prefix, returning the count removed
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
    /// Round-trip liveness probe
    async fn ping(&self) -> Result<()>;
    /// Last observed connection state
    fn connected(&self) -> bool;
}

/// Redis-backed cache store
pub struct RedisBackend {
    conn: Arc<tokio::sync::RwLock<Option<ConnectionManager>>>,
    connected: Arc<AtomicBool>,
    connecting: Arc<AtomicBool>,
    config: RedisConfig,
}

impl RedisBackend {
    /// Create the backend and start connecting in the background.
    ///
    /// Construction never blocks on the network; until the connection is
    /// established every operation reports unavailable and the cache layer
    /// degrades to misses.
    pub fn new(config: RedisConfig) -> Self {
        let backend = Self {
            conn: Arc::new(tokio::sync::RwLock::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            connecting: Arc::new(AtomicBool::new(false)),
            config,
        };
        if backend.config.enabled {
            backend.spawn_connect();
        }
        backend
    }

    /// Kick off a background connection attempt, at most one at a time.
    fn spawn_connect(&self) {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return;
        }

        let url = self.config.url.clone();
        let conn_slot = Arc::downgrade(&self.conn);
        let connected = Arc::clone(&self.connected);
        let connecting = Arc::clone(&self.connecting);

        tokio::spawn(async move {
            debug!("Connecting to redis at {}", sanitize_url(&url));
            loop {
                let attempt = async {
                    let client = redis::Client::open(url.as_str())
                        .map_err(|e| GatewayError::Cache(e.to_string()))?;
                    client
                        .get_connection_manager()
                        .await
                        .map_err(|e| GatewayError::Cache(e.to_string()))
                };

                match attempt.await {
                    Ok(manager) => {
                        let Some(slot) = conn_slot.upgrade() else {
                            break;
                        };
                        *slot.write().await = Some(manager);
                        connected.store(true, Ordering::SeqCst);
                        info!("Redis connection established");
                        break;
                    }
                    Err(e) => {
                        warn!("Redis connection failed, retrying in 5s: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        if conn_slot.upgrade().is_none() {
                            break;
                        }
                    }
                }
            }
            connecting.store(false, Ordering::SeqCst);
        });
    }

    async fn manager(&self) -> Result<ConnectionManager> {
        if !self.config.enabled {
            return Err(GatewayError::Cache("redis backend disabled".to_string()));
        }
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| GatewayError::Cache("redis not connected".to_string()))
    }

    fn on_success(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    fn on_failure(&self, context: &str, err: impl std::fmt::Display) -> GatewayError {
        self.connected.store(false, Ordering::SeqCst);
        GatewayError::Cache(format!("{}: {}", context, err))
    }

    /// Run a redis future under the configured operation timeout.
    async fn bounded<T>(
        &self,
        context: &str,
        fut: impl std::future::Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.op_timeout(), fut).await {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(value)
            }
            Ok(Err(e)) => Err(self.on_failure(context, e)),
            Err(_) => Err(self.on_failure(context, "operation timed out")),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager().await?;
        self.bounded("redis GET", conn.get::<_, Option<String>>(key))
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager().await?;
        let secs = ttl.as_secs().max(1);
        self.bounded("redis SETEX", conn.set_ex::<_, _, ()>(key, value, secs))
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager().await?;
        self.bounded("redis EXISTS", conn.exists::<_, bool>(key))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager().await?;
        let removed = self.bounded("redis DEL", conn.del::<_, u64>(key)).await?;
        Ok(removed > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut scan_conn = self.manager().await?;
        let pattern = format!("{}*", prefix);

        // Cursor SCAN rather than KEYS; enumeration is bounded by the op
        // timeout as one unit alongside each DEL batch.
        let keys: Vec<String> = match tokio::time::timeout(self.config.op_timeout(), async {
            let mut iter = scan_conn.scan_match::<_, String>(&pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            redis::RedisResult::Ok(keys)
        })
        .await
        {
            Ok(Ok(keys)) => keys,
            Ok(Err(e)) => return Err(self.on_failure("redis SCAN", e)),
            Err(_) => return Err(self.on_failure("redis SCAN", "operation timed out")),
        };

        if keys.is_empty() {
            self.on_success();
            return Ok(0);
        }

        let mut removed = 0u64;
        let mut del_conn = self.manager().await?;
        for chunk in keys.chunks(100) {
            removed += self
                .bounded("redis DEL", del_conn.del::<_, u64>(chunk.to_vec()))
                .await?;
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager().await?;
        let _: String = self
            .bounded("redis PING", async {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Sanitize a redis URL for logging (hide password)
fn sanitize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let mut sanitized = parsed.clone();
            if sanitized.password().is_some() {
                let _ = sanitized.set_password(Some("***"));
            }
            sanitized.to_string()
        }
        Err(_) => "invalid_url".to_string(),
    }
}

/// In-process TTL cache backend
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, (String, Instant)>>,
    failing: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every operation to fail, simulating an unreachable backend
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GatewayError::Cache("memory backend unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.entries
            .write()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        self.check_available()?;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    fn connected(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}
