use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use greenwindow_core::Clock;
use greenwindow_domain::{DeviceConfig, Result};

/// Wall clock in the configured timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// # Errors
    /// Returns `GreenWindowError::Config` for an unknown timezone name.
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        Ok(Self::new(config.timezone()?))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}
