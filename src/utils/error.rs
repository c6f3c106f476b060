//! Error types for the provider gateway
//!
//! The gateway is the sole translation boundary between raw provider/cache
//! failures and the typed errors seen by business-logic collaborators. Every
//! provider failure is classified into an [`ErrorCategory`] exactly once, at
//! the point where the raw failure is observed; no raw SDK error text reaches
//! callers except as a debug side-channel on [`GatewayError::Provider`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Classification of provider failures, decided once at the gateway boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// HTTP 429 or provider-reported quota exhaustion
    RateLimit,
    /// Request or connection deadline exceeded
    Timeout,
    /// Connection reset, DNS failure, or other transport fault
    Network,
    /// Upstream 5xx
    Server,
    /// Invalid or missing credentials (401/403)
    Auth,
    /// Provider content-safety rejection
    ContentSafety,
    /// Prompt exceeds the model context window
    ContextLength,
    /// Malformed request rejected by the provider (other 4xx)
    InvalidRequest,
}

impl ErrorCategory {
    /// Whether the retry executor may attempt the call again
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimit
                | ErrorCategory::Timeout
                | ErrorCategory::Network
                | ErrorCategory::Server
        )
    }

    /// User-presentable description, safe to surface to business collaborators
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCategory::RateLimit => "The AI provider is rate limiting requests",
            ErrorCategory::Timeout => "The AI provider took too long to respond",
            ErrorCategory::Network => "Could not reach the AI provider",
            ErrorCategory::Server => "The AI provider reported an internal error",
            ErrorCategory::Auth => "The AI provider rejected our credentials",
            ErrorCategory::ContentSafety => "The request was rejected by the provider's content filter",
            ErrorCategory::ContextLength => "The request exceeds the model's context window",
            ErrorCategory::InvalidRequest => "The provider rejected the request as malformed",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Auth => "auth",
            ErrorCategory::ContentSafety => "content_safety",
            ErrorCategory::ContextLength => "context_length",
            ErrorCategory::InvalidRequest => "invalid_request",
        };
        f.write_str(name)
    }
}

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classified provider failure; `detail` keeps the raw provider text for
    /// debugging and is never part of the user-facing message
    #[error("Provider error ({category}): {message}")]
    Provider {
        category: ErrorCategory,
        message: String,
        detail: Option<String>,
    },

    /// Circuit breaker has isolated the provider; raised by the breaker,
    /// translated by the per-provider adapters
    #[error("Circuit open for provider '{0}'")]
    CircuitOpen(String),

    /// User-facing "try again later" signal for required providers
    #[error("Service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    /// Cache backend errors; absorbed by the cache layer, never seen by
    /// gateway callers
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Build a classified provider error
    pub fn provider(category: ErrorCategory, message: impl Into<String>) -> Self {
        GatewayError::Provider {
            category,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach the raw provider payload as a debug side-channel
    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        match self {
            GatewayError::Provider {
                category, message, ..
            } => GatewayError::Provider {
                category,
                message,
                detail: Some(detail.into()),
            },
            other => other,
        }
    }

    /// Category of a classified provider error, if any
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            GatewayError::Provider { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// Whether the retry executor may attempt the operation again
    pub fn is_retryable(&self) -> bool {
        self.category().map(|c| c.is_retryable()).unwrap_or(false)
    }

    /// Whether this is the breaker's fail-fast rejection
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GatewayError::CircuitOpen(_))
    }
}

/// Map an HTTP status and response body to an error category.
///
/// Body inspection distinguishes the two provider 400 cases that must never
/// be retried for different reasons: content-safety rejections and
/// context-window overflows.
pub fn classify_status(status: u16, body: &str) -> ErrorCategory {
    match status {
        429 => ErrorCategory::RateLimit,
        401 | 403 => ErrorCategory::Auth,
        408 => ErrorCategory::Timeout,
        500..=599 => ErrorCategory::Server,
        400..=499 => {
            let lower = body.to_lowercase();
            if lower.contains("content_filter")
                || lower.contains("content_policy")
                || lower.contains("safety")
            {
                ErrorCategory::ContentSafety
            } else if lower.contains("context_length")
                || lower.contains("maximum context")
                || lower.contains("too many tokens")
            {
                ErrorCategory::ContextLength
            } else {
                ErrorCategory::InvalidRequest
            }
        }
        _ => ErrorCategory::Server,
    }
}

/// Classify a reqwest transport failure
pub fn classify_transport(err: &reqwest::Error) -> ErrorCategory {
    if err.is_timeout() {
        ErrorCategory::Timeout
    } else {
        ErrorCategory::Network
    }
}
