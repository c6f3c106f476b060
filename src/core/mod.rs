//! Core gateway functionality
//!
//! - **key**: request-to-cache-key normalization
//! - **cache**: networked semantic cache with fail-open semantics
//! - **recovery**: retry executor and circuit breaker
//! - **providers**: raw provider clients behind the `Provider` trait
//! - **gateway**: the composed per-provider gateway and its adapters

pub mod cache;
pub mod gateway;
pub mod key;
pub mod providers;
pub mod recovery;
