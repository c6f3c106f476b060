//! Types for the resilience primitives

use serde::{Deserialize, Serialize};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through; outcomes feed the rolling window
    Closed,
    /// Calls are rejected without touching the provider
    Open,
    /// One trial call is allowed through
    HalfOpen,
}

/// Rolling statistics over the breaker's current window
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStats {
    /// Calls admitted to the wrapped operation
    pub fires: u32,
    /// Admitted calls that succeeded
    pub successes: u32,
    /// Admitted calls that failed (includes timeouts)
    pub failures: u32,
    /// Admitted calls abandoned at the per-call timeout
    pub timeouts: u32,
    /// Calls rejected while open or during a half-open trial
    pub rejects: u64,
}

/// Read-only circuit state report for health-check collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitReport {
    /// Circuit is open (failing fast)
    pub opened: bool,
    /// Circuit is half-open (trial in progress or pending)
    pub half_open: bool,
    /// Circuit is closed (normal operation)
    pub closed: bool,
    /// Rolling window statistics
    pub stats: BreakerStats,
}

impl Default for CircuitReport {
    /// A quiet, closed circuit
    fn default() -> Self {
        Self::new(CircuitState::Closed, BreakerStats::default())
    }
}

impl CircuitReport {
    pub(super) fn new(state: CircuitState, stats: BreakerStats) -> Self {
        Self {
            opened: state == CircuitState::Open,
            half_open: state == CircuitState::HalfOpen,
            closed: state == CircuitState::Closed,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_flags_are_exclusive() {
        for state in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
            let report = CircuitReport::new(state, BreakerStats::default());
            let set = [report.opened, report.half_open, report.closed]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(set, 1);
        }
    }
}
