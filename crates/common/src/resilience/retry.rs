//! Generic retry executor with bounded exponential backoff
//!
//! The executor re-runs an async operation until it succeeds, the policy
//! refuses another attempt, the attempt budget is spent, or its
//! cancellation token fires during a backoff sleep. In every failure case
//! the caller receives the last error the operation produced, unchanged.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::time::timer::sleep_or_cancel;

/// Invalid executor configuration
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid retry configuration: {message}")]
pub struct RetryConfigError {
    pub message: String,
}

/// Outcome of a retry execution including the result and the backoff
/// delays that were actually slept.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    /// Number of times the operation ran.
    pub attempts: u32,
    /// Completed backoff sleeps, in order.
    pub delays: Vec<Duration>,
    /// A backoff sleep was aborted by the cancellation token.
    pub cancelled: bool,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }

    /// Sum of completed backoff sleeps.
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried and optionally provide a custom
    /// delay
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the configured backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// `initial_delay * base^attempt`, capped at `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay to sleep after the failed attempt with zero-based index `attempt`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = initial_delay.as_secs_f64() * base.powi(exponent);
                let capped = secs.min(max_delay.as_secs_f64());
                Duration::try_from_secs_f64(capped).unwrap_or(*max_delay)
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the initial attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    /// Three retries sleeping 2s, 4s, 8s.
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_secs(2),
                base: 2.0,
                max_delay: Duration::from_secs(60),
            },
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Total attempts including the first one.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`RetryConfigError`] when the exponential base is not positive.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        match &self.backoff {
            BackoffStrategy::Exponential { base, .. } if *base <= 0.0 => Err(RetryConfigError {
                message: "exponential base must be greater than 0".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    /// # Errors
    /// Propagates [`RetryConfig::validate`] failures.
    pub fn build(self) -> Result<RetryConfig, RetryConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
    cancel: CancellationToken,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy, cancel: CancellationToken::new() }
    }

    /// Create with default configuration
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    /// Abort backoff sleeps when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// # Errors
    /// Returns the error of the last attempt that ran.
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts()))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return the slept delays.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delays = Vec::new();
        let mut attempt: u32 = 0;

        loop {
            debug!(attempt = attempt + 1, max_attempts = self.config.max_attempts(), "Executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retries");
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt + 1, delays, cancelled: false };
                }
                Err(error) => error,
            };

            if attempt >= self.config.max_retries {
                warn!(attempts = attempt + 1, error = %error, "All retry attempts exhausted");
                return RetryOutcome { result: Err(error), attempts: attempt + 1, delays, cancelled: false };
            }

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt = attempt + 1, error = %error, "Retry policy declined another attempt");
                    return RetryOutcome { result: Err(error), attempts: attempt + 1, delays, cancelled: false };
                }
                RetryDecision::Retry => self.config.backoff.calculate_delay(attempt),
                RetryDecision::RetryAfter(custom) => custom,
            };

            warn!(
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Operation failed, retrying after backoff"
            );

            if sleep_or_cancel(delay, &self.cancel).await.is_cancelled() {
                debug!(attempt = attempt + 1, "Backoff sleep cancelled");
                return RetryOutcome { result: Err(error), attempts: attempt + 1, delays, cancelled: true };
            }

            delays.push(delay);
            attempt += 1;
        }
    }
}
