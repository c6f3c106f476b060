//! Periodic health monitoring

pub mod health;

pub use health::{GatewayHealth, HealthMonitor, HealthSnapshot, OverallStatus};
