//! Cancellable sleeps
//!
//! Every timer a device owns (backoff sleeps, the refresh chain, polling
//! ticks) waits through these helpers so a single `CancellationToken` can
//! abort all of them at teardown.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a cancellable sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    Cancelled,
}

impl SleepOutcome {
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Sleep until `deadline` unless `cancel` fires first.
pub async fn sleep_until_or_cancel(deadline: Instant, cancel: &CancellationToken) -> SleepOutcome {
    if cancel.is_cancelled() {
        return SleepOutcome::Cancelled;
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => SleepOutcome::Cancelled,
        () = tokio::time::sleep_until(deadline) => SleepOutcome::Elapsed,
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> SleepOutcome {
    sleep_until_or_cancel(Instant::now() + duration, cancel).await
}
