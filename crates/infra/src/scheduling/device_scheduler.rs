//! Device scheduler for the session and polling loops.
//!
//! On start a single driver task is spawned. It runs the initial sync, then
//! arms the token refresh chain and the two periodic tasks side by side:
//!
//! - greenest-moment sync every `sync_interval` (window, display, percentage)
//! - alarm evaluation every `alarm_interval` (local only, edge-triggered)
//!
//! The first periodic tick fires one full period after the initial sync.
//! Cycle errors are logged inside the service and never end a loop.
//!
//! Stopping cancels the device token. The same token is handed to the
//! energy API client, so a pending retry backoff is aborted as well; any
//! in-flight cycle is dropped at its next await point.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use greenwindow_infra::scheduling::{DeviceScheduler, DeviceSchedulerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(
//! #     service: Arc<greenwindow_core::GreenestMomentService>,
//! #     session: Arc<greenwindow_core::TokenLifecycleManager>,
//! # ) -> Result<(), greenwindow_infra::SchedulerError> {
//! let cancel = CancellationToken::new();
//! let mut scheduler =
//!     DeviceScheduler::new(service, session, DeviceSchedulerConfig::default(), cancel);
//!
//! scheduler.start()?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use greenwindow_core::{GreenestMomentService, TokenLifecycleManager};
use greenwindow_domain::DeviceConfig;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the device scheduler
#[derive(Debug, Clone)]
pub struct DeviceSchedulerConfig {
    /// Greenest-moment sync period
    pub sync_interval: Duration,
    /// Alarm evaluation period
    pub alarm_interval: Duration,
    /// How long `stop` waits for the driver task
    pub join_timeout: Duration,
}

impl DeviceSchedulerConfig {
    pub const fn from_device(config: &DeviceConfig) -> Self {
        Self {
            sync_interval: config.sync_interval(),
            alarm_interval: config.alarm_interval(),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for DeviceSchedulerConfig {
    fn default() -> Self {
        Self::from_device(&DeviceConfig::default())
    }
}

/// Timers of one paired device
pub struct DeviceScheduler {
    service: Arc<GreenestMomentService>,
    session: Arc<TokenLifecycleManager>,
    config: DeviceSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl DeviceScheduler {
    /// Create a new scheduler
    ///
    /// `cancel` is the device token; pass the same token to the energy API
    /// client so teardown also aborts retry backoff.
    pub fn new(
        service: Arc<GreenestMomentService>,
        session: Arc<TokenLifecycleManager>,
        config: DeviceSchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self { service, session, config, cancellation_token: cancel, task_handle: None }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Start the scheduler
    ///
    /// Spawns the driver task and returns immediately; the initial sync
    /// runs inside the task.
    ///
    /// # Errors
    ///
    /// Returns error if the scheduler is already running or was stopped.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.cancellation_token.is_cancelled() {
            return Err(SchedulerError::ShutDown);
        }

        info!(
            sync_interval_secs = self.config.sync_interval.as_secs(),
            alarm_interval_secs = self.config.alarm_interval.as_secs(),
            "Starting device scheduler"
        );

        let service = Arc::clone(&self.service);
        let session = Arc::clone(&self.session);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        self.task_handle = Some(tokio::spawn(Self::drive(service, session, config, cancel)));
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the device token and awaits the driver task.
    ///
    /// # Errors
    ///
    /// Returns error if the scheduler is not running, or the task does not
    /// finish within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping device scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Device scheduler stopped");
        Ok(())
    }

    /// Check if the driver task is alive
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn drive(
        service: Arc<GreenestMomentService>,
        session: Arc<TokenLifecycleManager>,
        config: DeviceSchedulerConfig,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Cancelled during initial sync");
                return;
            }
            () = service.initial_sync() => {}
        }

        let sync_service = Arc::clone(&service);
        let sync_loop = run_periodic("greenest_moment_sync", config.sync_interval, cancel.clone(), move || {
            let service = Arc::clone(&sync_service);
            async move { service.run_sync_cycle().await }
        });
        let alarm_loop = run_periodic("alarm_evaluation", config.alarm_interval, cancel.clone(), move || {
            let service = Arc::clone(&service);
            async move { service.run_alarm_cycle().await }
        });

        tokio::join!(session.run_refresh_loop(cancel), sync_loop, alarm_loop);
        debug!("Device scheduler driver finished");
    }
}

impl Drop for DeviceScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("Device scheduler dropped while running; cancelling its tasks");
            self.cancellation_token.cancel();
        }
    }
}

/// Run `cycle` every `period` until `cancel` fires.
///
/// Ticks that fall due while a cycle is still running are delayed rather
/// than bunched up.
async fn run_periodic<F, Fut>(task: &'static str, period: Duration, cancel: CancellationToken, mut cycle: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        debug!(task, "Periodic task tick");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = cycle() => {}
        }
    }

    debug!(task, "Periodic task cancelled");
}
