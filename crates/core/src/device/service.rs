//! Greenest-moment service - core business logic
//!
//! Two independent cadences drive this service: a slow sync that talks to
//! the remote API and a fast, purely local alarm evaluation. Each cycle
//! catches and logs its own failures so one bad cycle never affects the
//! next one or the other cadence.

use std::sync::Arc;

use greenwindow_common::time::format_window_range;
use greenwindow_domain::constants::{STORE_GREENEST_MOMENT, STORE_ORGANIZATION_ID};
use greenwindow_domain::{Capability, GreenWindowError, GreenestMomentWindow, Result};
use tracing::{debug, error, info, instrument};

use super::ports::{CapabilitySink, Clock, DeviceStore, GreenEnergyApi};

/// What an alarm evaluation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmUpdate {
    /// No window persisted yet; nothing evaluated.
    NoWindow,
    /// Alarm already had this value; nothing published.
    Unchanged(bool),
    /// Value flipped and was published.
    Changed { from: bool, to: bool },
}

impl AlarmUpdate {
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Greenest-moment device service
pub struct GreenestMomentService {
    api: Arc<dyn GreenEnergyApi>,
    store: Arc<dyn DeviceStore>,
    capabilities: Arc<dyn CapabilitySink>,
    clock: Arc<dyn Clock>,
}

impl GreenestMomentService {
    /// Create a new greenest-moment service
    pub fn new(
        api: Arc<dyn GreenEnergyApi>,
        store: Arc<dyn DeviceStore>,
        capabilities: Arc<dyn CapabilitySink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { api, store, capabilities, clock }
    }

    pub fn capabilities(&self) -> Arc<dyn CapabilitySink> {
        Arc::clone(&self.capabilities)
    }

    /// Fetch today's window and persist it.
    #[instrument(skip(self))]
    pub async fn sync_greenest_moment(&self) -> Result<GreenestMomentWindow> {
        let organization_id = self.organization_id().await?;
        let window = self.api.fetch_greenest_moment_window(&organization_id).await?;

        let value = serde_json::to_value(&window)
            .map_err(|e| GreenWindowError::Internal(format!("Failed to encode window: {e}")))?;
        self.store.set(STORE_GREENEST_MOMENT, value).await?;

        info!(
            window_start = %window.window_start,
            window_end = %window.window_end,
            "Greenest moment updated"
        );
        Ok(window)
    }

    /// Fetch the current percentage and publish it unconditionally.
    #[instrument(skip(self))]
    pub async fn sync_green_energy_percentage(&self) -> Result<u8> {
        let organization_id = self.organization_id().await?;
        let percentage = self.api.fetch_green_energy_percentage(&organization_id).await?;

        self.capabilities.write(Capability::MeasureGreenEnergy, percentage.into()).await?;

        info!(percentage, "Green energy percentage updated");
        Ok(percentage)
    }

    /// Render the persisted window as `HH:MM - HH:MM` and publish it.
    ///
    /// Returns `None` when no window has been persisted yet.
    pub async fn update_greenest_moment_display(&self) -> Result<Option<String>> {
        let Some(window) = self.persisted_window().await? else {
            debug!("No greenest moment stored, display not updated");
            return Ok(None);
        };

        let rendered =
            format_window_range(window.window_start, window.window_end, self.clock.timezone());
        self.capabilities.write(Capability::GreenestMoment, rendered.clone().into()).await?;

        debug!(display = %rendered, "Greenest moment display updated");
        Ok(Some(rendered))
    }

    /// Recompute the alarm and publish it only when it flips.
    ///
    /// A never-written alarm counts as `false`.
    pub async fn update_alarm(&self) -> Result<AlarmUpdate> {
        let Some(window) = self.persisted_window().await? else {
            return Ok(AlarmUpdate::NoWindow);
        };

        let now = self.clock.now();
        let active = window.contains(now);
        let current = self.is_greenest_moment_now();

        if current == active {
            return Ok(AlarmUpdate::Unchanged(active));
        }

        self.capabilities.write(Capability::AlarmGreenestMoment, active.into()).await?;

        info!(
            from = current,
            to = active,
            now = %now,
            window_start = %window.window_start,
            window_end = %window.window_end,
            "Greenest moment alarm changed"
        );
        Ok(AlarmUpdate::Changed { from: current, to: active })
    }

    /// Last published alarm value, without fetching anything.
    pub fn is_greenest_moment_now(&self) -> bool {
        self.capabilities
            .value(Capability::AlarmGreenestMoment)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// First sync after the device comes up.
    ///
    /// Window, display and alarm form one step; the percentage is a second
    /// step that runs even if the first failed.
    pub async fn initial_sync(&self) {
        if let Err(e) = self.sync_window_step(true).await {
            error!(error = %e, kind = e.kind(), "Initial greenest moment sync failed");
        }
        if let Err(e) = self.sync_green_energy_percentage().await {
            error!(error = %e, kind = e.kind(), "Initial green energy percentage sync failed");
        }
    }

    /// Slow-cadence cycle: refresh window and display, then percentage.
    pub async fn run_sync_cycle(&self) {
        if let Err(e) = self.sync_window_step(false).await {
            error!(error = %e, kind = e.kind(), "Greenest moment sync failed");
        }
        if let Err(e) = self.sync_green_energy_percentage().await {
            error!(error = %e, kind = e.kind(), "Green energy percentage sync failed");
        }
    }

    /// Fast-cadence cycle: local alarm evaluation only.
    pub async fn run_alarm_cycle(&self) {
        if let Err(e) = self.update_alarm().await {
            error!(error = %e, kind = e.kind(), "Greenest moment alarm update failed");
        }
    }

    async fn sync_window_step(&self, with_alarm: bool) -> Result<()> {
        self.sync_greenest_moment().await?;
        self.update_greenest_moment_display().await?;
        if with_alarm {
            self.update_alarm().await?;
        }
        Ok(())
    }

    async fn organization_id(&self) -> Result<String> {
        match self.store.get(STORE_ORGANIZATION_ID).await? {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(id),
            _ => Err(GreenWindowError::Data("Device store has no organization id".to_string())),
        }
    }

    async fn persisted_window(&self) -> Result<Option<GreenestMomentWindow>> {
        self.store
            .get(STORE_GREENEST_MOMENT)
            .await?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    GreenWindowError::Data(format!("Stored greenest moment is malformed: {e}"))
                })
            })
            .transpose()
    }
}
