//! Port interfaces for session management

use async_trait::async_trait;
use greenwindow_domain::constants::{SETTINGS_PASSWORD, SETTINGS_USERNAME};
use greenwindow_domain::{Credentials, Result, Session};

/// OAuth2 token endpoint of the energy provider
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Resource-owner password grant.
    async fn password_grant(&self, credentials: &Credentials) -> Result<Session>;

    /// Refresh-token grant.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<Session>;
}

/// Process-wide settings that survive restarts
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Source of the bearer token for API requests
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Stored credentials, if both halves are present.
///
/// # Errors
/// Propagates settings store failures.
pub async fn load_credentials(settings: &dyn SettingsStore) -> Result<Option<Credentials>> {
    let username = settings.get(SETTINGS_USERNAME).await?;
    let password = settings.get(SETTINGS_PASSWORD).await?;
    Ok(match (username, password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        _ => None,
    })
}

/// # Errors
/// Propagates settings store failures.
pub async fn save_credentials(settings: &dyn SettingsStore, credentials: &Credentials) -> Result<()> {
    settings.set(SETTINGS_USERNAME, &credentials.username).await?;
    settings.set(SETTINGS_PASSWORD, &credentials.password).await
}
