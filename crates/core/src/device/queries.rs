//! Read-only query surface over registered devices
//!
//! Widgets and flow conditions read cached capability values here. Nothing
//! in this module triggers a fetch; when no device is registered the
//! documented defaults are returned.

use std::sync::Arc;

use greenwindow_domain::constants::{
    CONDITION_GREENEST_MOMENT_NOW, NO_DEVICE_ALARM, NO_DEVICE_DISPLAY, NO_DEVICE_PERCENTAGE,
};
use greenwindow_domain::Capability;
use parking_lot::RwLock;

use super::ports::CapabilitySink;

struct RegisteredDevice {
    id: String,
    capabilities: Arc<dyn CapabilitySink>,
}

/// Devices currently alive in this process, in registration order.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<RegisteredDevice>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, replacing any earlier registration with the same id.
    pub fn register(&self, id: impl Into<String>, capabilities: Arc<dyn CapabilitySink>) {
        let id = id.into();
        let mut devices = self.devices.write();
        devices.retain(|d| d.id != id);
        devices.push(RegisteredDevice { id, capabilities });
    }

    /// Returns `true` if the device was registered.
    pub fn unregister(&self, id: &str) -> bool {
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|d| d.id != id);
        devices.len() != before
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Current greenest-moment display string of the first device.
    pub fn greenest_moment_display(&self) -> String {
        self.first()
            .and_then(|sink| sink.value(Capability::GreenestMoment))
            .and_then(|v| v.as_text().map(str::to_string))
            .unwrap_or_else(|| NO_DEVICE_DISPLAY.to_string())
    }

    /// Current green energy percentage of the first device.
    pub fn green_energy_percentage(&self) -> u8 {
        self.first()
            .and_then(|sink| sink.value(Capability::MeasureGreenEnergy))
            .and_then(|v| v.as_number())
            .and_then(|n| u8::try_from(n.clamp(0, 100)).ok())
            .unwrap_or(NO_DEVICE_PERCENTAGE)
    }

    /// Current alarm value of the first device.
    pub fn greenest_moment_alarm(&self) -> bool {
        self.first()
            .and_then(|sink| sink.value(Capability::AlarmGreenestMoment))
            .and_then(|v| v.as_bool())
            .unwrap_or(NO_DEVICE_ALARM)
    }

    /// Evaluate a named flow condition for one device.
    ///
    /// Returns `None` for unknown conditions or devices.
    pub fn evaluate_condition(&self, condition: &str, device_id: &str) -> Option<bool> {
        if condition != CONDITION_GREENEST_MOMENT_NOW {
            return None;
        }
        let devices = self.devices.read();
        let device = devices.iter().find(|d| d.id == device_id)?;
        Some(
            device
                .capabilities
                .value(Capability::AlarmGreenestMoment)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        )
    }

    fn first(&self) -> Option<Arc<dyn CapabilitySink>> {
        self.devices.read().first().map(|d| Arc::clone(&d.capabilities))
    }
}
