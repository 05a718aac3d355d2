//! Modular common utilities shared across GreenWindow crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: local-time formatting helpers
//! - `runtime`: async infrastructure (cancellable sleeps, retry executor)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation + runtime tiers
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod time;

#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{RetryConfig, RetryDecision, RetryExecutor, RetryOutcome, RetryPolicy};
