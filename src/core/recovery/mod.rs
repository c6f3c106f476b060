//! Resilience primitives: retry executor and circuit breaker
//!
//! These are pure primitives: the retry executor knows nothing about the
//! breaker or the cache, and the breaker treats the operation it wraps as
//! atomic. The gateway composes them.

pub mod circuit_breaker;
pub mod retry;
pub mod types;

pub use circuit_breaker::{BreakerObserver, CircuitBreaker, LoggingObserver};
pub use retry::RetryExecutor;
pub use types::{BreakerStats, CircuitReport, CircuitState};
