//! Raw provider clients
//!
//! Each provider sits behind the [`Provider`] trait so the gateway can be
//! generic over them. Clients own their HTTP plumbing and the mapping from
//! raw HTTP failures to [`crate::utils::error::ErrorCategory`]; nothing
//! above this layer sees a raw status code or response body.

pub mod completion;
pub mod search;

pub use completion::{CompletionClient, CompletionRequest, CompletionResponse, TokenUsage};
pub use search::{SearchClient, SearchRequest, SearchResponse, SearchResult, SearchType};

use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Provider type, used to scope cache configuration, stats, and breakers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Text completion provider
    Completion,
    /// Web search provider
    Search,
}

impl ProviderKind {
    /// Stable name used in logs and stats
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Completion => "completion",
            ProviderKind::Search => "search",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A callable upstream provider.
///
/// `call` performs exactly one network round-trip; retries, timeouts, and
/// caching are layered on by the gateway.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Request value object; fully determines the response for caching
    type Request: Send + Sync + Clone;
    /// Normalized response value
    type Response: Serialize + DeserializeOwned + Send + Sync + Clone;

    /// Provider type for cache scoping and logs
    fn kind(&self) -> ProviderKind;

    /// The request fields that determine the cache key, in a fixed order
    fn key_fields(&self, request: &Self::Request) -> Vec<String>;

    /// Whether a response is a degraded/fallback result that must never be
    /// cached
    fn is_degraded(&self, _response: &Self::Response) -> bool {
        false
    }

    /// Perform one raw provider call
    async fn call(&self, request: &Self::Request) -> Result<Self::Response>;

    /// Minimal real call measuring provider latency; used by health
    /// monitoring, bypasses cache and breaker
    async fn ping(&self) -> Result<Duration>;
}
