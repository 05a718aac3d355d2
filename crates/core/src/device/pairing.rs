//! Device pairing use case

use std::sync::Arc;

use greenwindow_domain::constants::{
    DEVICE_NAME, STORE_GREENEST_MOMENT, STORE_ORGANIZATION_ID, STORE_USER_ID,
};
use greenwindow_domain::{Credentials, GreenWindowError, PairedDevice, Result};
use serde_json::Value;
use tracing::{info, instrument};

use super::ports::{DeviceStore, GreenEnergyApi};
use crate::session::TokenLifecycleManager;

/// Authenticates a user and resolves everything a new device needs.
pub struct DevicePairing {
    session: Arc<TokenLifecycleManager>,
    api: Arc<dyn GreenEnergyApi>,
}

impl DevicePairing {
    pub fn new(session: Arc<TokenLifecycleManager>, api: Arc<dyn GreenEnergyApi>) -> Self {
        Self { session, api }
    }

    /// Log in, resolve user and organization, and fetch the first window.
    ///
    /// # Errors
    /// Any failing step aborts pairing with that step's error.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn pair(&self, credentials: &Credentials) -> Result<PairedDevice> {
        self.session.authenticate_with_credentials(credentials).await?;

        let user_id = self.api.resolve_user_id().await?;
        let organization_id = self.api.resolve_organization_id(&user_id).await?;
        let greenest_moment = self.api.fetch_greenest_moment_window(&organization_id).await?;

        info!(user_id = %user_id, organization_id = %organization_id, "Device paired");

        Ok(PairedDevice {
            id: user_id.clone(),
            name: DEVICE_NAME.to_string(),
            user_id,
            organization_id,
            greenest_moment,
        })
    }
}

/// Write the pairing result into a fresh device store.
///
/// # Errors
/// Propagates store failures.
pub async fn seed_device_store(device: &PairedDevice, store: &dyn DeviceStore) -> Result<()> {
    let window = serde_json::to_value(&device.greenest_moment)
        .map_err(|e| GreenWindowError::Internal(format!("Failed to encode window: {e}")))?;

    store.set(STORE_USER_ID, Value::String(device.user_id.clone())).await?;
    store.set(STORE_ORGANIZATION_ID, Value::String(device.organization_id.clone())).await?;
    store.set(STORE_GREENEST_MOMENT, window).await
}
