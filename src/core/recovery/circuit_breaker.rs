//! Circuit breaker for provider isolation
//!
//! Three-state machine shared by every in-flight invocation of one
//! provider. The rolling window accumulates call outcomes; once at least
//! `volume_threshold` calls land in the window and the failure percentage
//! reaches `error_threshold_percentage`, the circuit opens and rejects
//! calls without touching the provider. After `reset_timeout` a single
//! trial call is admitted; its outcome decides between closing and
//! re-opening.
//!
//! State transitions are observable through [`BreakerObserver`]; observers
//! are notification-only and never participate in decisions.

use super::types::{BreakerStats, CircuitReport, CircuitState};
use crate::config::BreakerConfig;
use crate::utils::error::{ErrorCategory, GatewayError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Observer of breaker state transitions
pub trait BreakerObserver: Send + Sync {
    /// Called after each transition, outside the breaker's lock
    fn on_transition(&self, breaker: &str, from: CircuitState, to: CircuitState);
}

/// Default observer: logs transitions through tracing
pub struct LoggingObserver;

impl BreakerObserver for LoggingObserver {
    fn on_transition(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => {
                warn!(breaker, ?from, "circuit opened, rejecting calls")
            }
            CircuitState::HalfOpen => {
                info!(breaker, ?from, "circuit half-open, admitting one trial call")
            }
            CircuitState::Closed => info!(breaker, ?from, "circuit closed"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Admission {
    Normal,
    Trial,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure,
    Timeout,
}

/// An admitted call that must be settled exactly once.
///
/// `call` futures can be dropped mid-flight (task abort, client
/// disconnect, shutdown). If the outcome was never recorded, `Drop`
/// un-counts the fire and, for a trial, releases the half-open slot and
/// returns the circuit to open with a fresh reset countdown, so the next
/// trial is always eventually admitted.
struct Admitted<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    recorded: bool,
}

impl Drop for Admitted<'_> {
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        let mut transitions = Vec::new();
        {
            let mut inner = self.breaker.inner.lock();
            inner.stats.fires = inner.stats.fires.saturating_sub(1);
            if matches!(self.admission, Admission::Trial) {
                inner.trial_in_flight = false;
                if inner.state == CircuitState::HalfOpen {
                    transitions.push((CircuitState::HalfOpen, CircuitState::Open));
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
        self.breaker.notify(&transitions);
    }
}

struct Inner {
    state: CircuitState,
    stats: BreakerStats,
    window_start: Instant,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Inner {
    /// Restart the rolling window once it has aged out. Rejects are
    /// cumulative and survive the roll.
    fn roll_window_if_due(&mut self, window: std::time::Duration) {
        if self.window_start.elapsed() >= window {
            let rejects = self.stats.rejects;
            self.stats = BreakerStats {
                rejects,
                ..BreakerStats::default()
            };
            self.window_start = Instant::now();
        }
    }

    fn failure_rate_trips(&self, config: &BreakerConfig) -> bool {
        self.stats.fires >= config.volume_threshold
            && u64::from(self.stats.failures) * 100
                >= u64::from(config.error_threshold_percentage) * u64::from(self.stats.fires)
    }
}

/// Per-provider circuit breaker.
///
/// One instance per provider, shared across all concurrent invocations;
/// the rolling statistics and transitions are updated under an internal
/// mutex so concurrent completions never corrupt counts or double-trigger
/// a transition.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
    observers: Vec<Arc<dyn BreakerObserver>>,
}

impl CircuitBreaker {
    /// Create a breaker with the default logging observer
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                stats: BreakerStats::default(),
                window_start: Instant::now(),
                opened_at: None,
                trial_in_flight: false,
            }),
            observers: vec![Arc::new(LoggingObserver)],
        }
    }

    /// Attach an additional transition observer
    pub fn with_observer(mut self, observer: Arc<dyn BreakerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Execute `f` under breaker protection and the per-call timeout.
    ///
    /// Rejected calls fail with [`GatewayError::CircuitOpen`] without the
    /// operation being constructed. A call exceeding the timeout counts as
    /// a failure and is abandoned; whatever it eventually resolves to is
    /// ignored. Dropping the returned future before it resolves un-counts
    /// the admission (see [`Admitted`]).
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut permit = self.admit()?;

        match tokio::time::timeout(self.config.call_timeout(), f()).await {
            Ok(Ok(value)) => {
                self.record(&mut permit, Outcome::Success);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record(&mut permit, Outcome::Failure);
                Err(err)
            }
            Err(_) => {
                self.record(&mut permit, Outcome::Timeout);
                Err(GatewayError::provider(
                    ErrorCategory::Timeout,
                    format!(
                        "call to '{}' exceeded {:?}",
                        self.name,
                        self.config.call_timeout()
                    ),
                ))
            }
        }
    }

    fn admit(&self) -> Result<Admitted<'_>> {
        let mut transitions = Vec::new();
        let admission = {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed => {
                    inner.roll_window_if_due(self.config.window());
                    inner.stats.fires += 1;
                    Ok(Admission::Normal)
                }
                CircuitState::Open => {
                    let due = inner
                        .opened_at
                        .map(|at| at.elapsed() >= self.config.reset_timeout())
                        .unwrap_or(true);
                    if due {
                        transitions.push((CircuitState::Open, CircuitState::HalfOpen));
                        inner.state = CircuitState::HalfOpen;
                        inner.trial_in_flight = true;
                        inner.stats.fires += 1;
                        Ok(Admission::Trial)
                    } else {
                        inner.stats.rejects += 1;
                        Err(GatewayError::CircuitOpen(self.name.clone()))
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.trial_in_flight {
                        inner.stats.rejects += 1;
                        Err(GatewayError::CircuitOpen(self.name.clone()))
                    } else {
                        inner.trial_in_flight = true;
                        inner.stats.fires += 1;
                        Ok(Admission::Trial)
                    }
                }
            }
        };
        self.notify(&transitions);
        admission.map(|admission| Admitted {
            breaker: self,
            admission,
            recorded: false,
        })
    }

    fn record(&self, permit: &mut Admitted<'_>, outcome: Outcome) {
        permit.recorded = true;
        let admission = permit.admission;
        let mut transitions = Vec::new();
        {
            let mut inner = self.inner.lock();
            match outcome {
                Outcome::Success => inner.stats.successes += 1,
                Outcome::Failure => inner.stats.failures += 1,
                Outcome::Timeout => {
                    inner.stats.failures += 1;
                    inner.stats.timeouts += 1;
                }
            }

            match admission {
                Admission::Trial => {
                    inner.trial_in_flight = false;
                    match outcome {
                        Outcome::Success => {
                            transitions.push((inner.state, CircuitState::Closed));
                            inner.state = CircuitState::Closed;
                            inner.opened_at = None;
                            inner.stats = BreakerStats {
                                rejects: inner.stats.rejects,
                                ..BreakerStats::default()
                            };
                            inner.window_start = Instant::now();
                        }
                        Outcome::Failure | Outcome::Timeout => {
                            transitions.push((inner.state, CircuitState::Open));
                            inner.state = CircuitState::Open;
                            inner.opened_at = Some(Instant::now());
                        }
                    }
                }
                Admission::Normal => {
                    if inner.state == CircuitState::Closed
                        && matches!(outcome, Outcome::Failure | Outcome::Timeout)
                        && inner.failure_rate_trips(&self.config)
                    {
                        transitions.push((CircuitState::Closed, CircuitState::Open));
                        inner.state = CircuitState::Open;
                        inner.opened_at = Some(Instant::now());
                    }
                }
            }
        }
        self.notify(&transitions);
    }

    fn notify(&self, transitions: &[(CircuitState, CircuitState)]) {
        for (from, to) in transitions {
            for observer in &self.observers {
                observer.on_transition(&self.name, *from, *to);
            }
        }
    }

    /// Current state (as of the last call; open circuits move to half-open
    /// on the next admission attempt after the reset timeout)
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Read-only report for health-check collaborators
    pub fn report(&self) -> CircuitReport {
        let inner = self.inner.lock();
        CircuitReport::new(inner.state, inner.stats)
    }

    /// Breaker name as used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }
}
