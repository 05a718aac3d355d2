//! Resilience patterns for remote calls
//!
//! [`retry`] provides a generic executor that re-runs a fallible async
//! operation with bounded backoff. It knows nothing about what it retries:
//! the error type is generic and the decision to retry is delegated to a
//! [`RetryPolicy`]. Backoff sleeps observe a `CancellationToken` so owners
//! can abort them at teardown.

pub mod retry;

// Re-export retry types
pub use retry::{
    BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryConfigError, RetryDecision, RetryExecutor,
    RetryOutcome, RetryPolicy,
};
