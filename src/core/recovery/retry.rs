//! Retry executor with capped exponential backoff
//!
//! Wraps a single fallible async operation with bounded, classified
//! retries. Only errors whose [`ErrorCategory`] is retryable are attempted
//! again; everything else propagates immediately and unchanged. The
//! executor performs no caching and has no knowledge of circuit state.

use crate::config::RetryConfig;
use crate::utils::error::Result;
use std::time::Duration;
use tracing::{debug, error};

/// Retry executor; cheap to clone, immutable after construction
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create an executor with the given policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute `f`, retrying retryable failures up to `max_retries` times.
    ///
    /// The operation runs 1 + max_retries times at most; the final error is
    /// propagated unchanged. Backoff sleeps use cancellable timers, so
    /// dropping the returned future aborts any pending wait.
    pub async fn call<F, Fut, T>(&self, op_name: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match f().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(operation = op_name, attempt, "retry succeeded");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    let category = err.category();
                    if !err.is_retryable() {
                        debug!(
                            operation = op_name,
                            attempt,
                            category = ?category,
                            "error not retryable: {}",
                            err
                        );
                        return Err(err);
                    }
                    if attempt > self.config.max_retries {
                        error!(
                            operation = op_name,
                            attempt,
                            category = ?category,
                            "giving up after {} attempts: {}",
                            attempt,
                            err
                        );
                        return Err(err);
                    }

                    let delay = self.backoff_delay(attempt);
                    debug!(
                        operation = op_name,
                        attempt,
                        category = ?category,
                        "attempt failed, retrying in {:?}: {}",
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// `min(base * 2^(attempt-1), max)`, with optional ±10% jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let base_ms = self.config.base_delay().as_millis() as u64;
        let capped_ms = base_ms
            .saturating_mul(1u64 << exp)
            .min(self.config.max_delay().as_millis() as u64);

        if self.config.jitter {
            let jitter = capped_ms as f64 * 0.1 * (rand::random::<f64>() - 0.5);
            Duration::from_millis((capped_ms as f64 + jitter).max(0.0) as u64)
        } else {
            Duration::from_millis(capped_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{ErrorCategory, GatewayError};

    fn fast_policy(max_retries: u32) -> RetryExecutor {
        RetryExecutor::new(RetryConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: false,
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 10,
            base_delay_ms: 100,
            max_delay_ms: 450,
            jitter: false,
        });
        assert_eq!(executor.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(executor.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(executor.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(executor.backoff_delay(4), Duration::from_millis(450));
        assert_eq!(executor.backoff_delay(10), Duration::from_millis(450));
    }

    #[test]
    fn test_backoff_jitter_stays_near_nominal() {
        let executor = RetryExecutor::new(RetryConfig {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            jitter: true,
        });
        for _ in 0..50 {
            let delay = executor.backoff_delay(1).as_millis() as i64;
            assert!((950..=1_050).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[tokio::test]
    async fn test_retryable_error_attempted_exactly_max_plus_one_times() {
        let executor = fast_policy(3);
        let mut attempts = 0u32;

        let result: Result<()> = executor
            .call("test", || {
                attempts += 1;
                async { Err(GatewayError::provider(ErrorCategory::Server, "500")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn test_non_retryable_error_attempted_once() {
        let executor = fast_policy(3);
        let mut attempts = 0u32;

        let result: Result<()> = executor
            .call("test", || {
                attempts += 1;
                async { Err(GatewayError::provider(ErrorCategory::Auth, "401")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let executor = fast_policy(3);
        let mut attempts = 0u32;

        let result = executor
            .call("test", || {
                attempts += 1;
                let fail = attempts < 3;
                async move {
                    if fail {
                        Err(GatewayError::provider(ErrorCategory::RateLimit, "429"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_last_error_propagated_unchanged() {
        let executor = fast_policy(1);

        let result: Result<()> = executor
            .call("test", || async {
                Err(GatewayError::provider(ErrorCategory::Server, "boom").with_detail("raw"))
            })
            .await;

        match result {
            Err(GatewayError::Provider {
                category, detail, ..
            }) => {
                assert_eq!(category, ErrorCategory::Server);
                assert_eq!(detail.as_deref(), Some("raw"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let executor = fast_policy(0);
        let mut attempts = 0u32;

        let _: Result<()> = executor
            .call("test", || {
                attempts += 1;
                async { Err(GatewayError::provider(ErrorCategory::Network, "reset")) }
            })
            .await;

        assert_eq!(attempts, 1);
    }
}
