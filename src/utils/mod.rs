//! Utility modules for the provider gateway
//!
//! - **error**: Error types, categories, and classification
//! - **logging**: Tracing subscriber setup

pub mod error;
pub mod logging;

pub use error::{ErrorCategory, GatewayError, Result};
