//! Port interfaces for the greenest-moment device
//!
//! These traits define the boundaries between core business logic and the
//! host platform (stores, capabilities, clock) or the remote energy API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use greenwindow_domain::{Capability, CapabilityValue, GreenestMomentWindow, Result};
use serde_json::Value;

/// Typed operations against the remote energy API
#[async_trait]
pub trait GreenEnergyApi: Send + Sync {
    /// User id carried by the current access token.
    async fn resolve_user_id(&self) -> Result<String>;

    /// Organization owning the user's first product group resource.
    async fn resolve_organization_id(&self, user_id: &str) -> Result<String>;

    /// Today's 3-hour greenest window, as returned by the provider.
    async fn fetch_greenest_moment_window(&self, organization_id: &str) -> Result<GreenestMomentWindow>;

    /// Rounded percentage of the forecast entry closest to now.
    async fn fetch_green_energy_percentage(&self, organization_id: &str) -> Result<u8>;
}

/// Persistent per-device key/value store
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Capability values exposed to the host
#[async_trait]
pub trait CapabilitySink: Send + Sync {
    /// Last written value, if any.
    fn value(&self, capability: Capability) -> Option<CapabilityValue>;

    async fn set_value(&self, capability: Capability, value: CapabilityValue) -> Result<()>;

    async fn publish_realtime(&self, capability: Capability, value: CapabilityValue) -> Result<()>;

    /// Set the value and emit the matching realtime event.
    async fn write(&self, capability: Capability, value: CapabilityValue) -> Result<()> {
        self.set_value(capability, value.clone()).await?;
        self.publish_realtime(capability, value).await
    }
}

/// Wall clock plus the user's configured timezone
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn timezone(&self) -> Tz;
}
