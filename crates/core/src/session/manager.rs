//! Token lifecycle manager with a perpetual refresh chain
//!
//! Owns the device's OAuth2 session:
//! - Initial password grant, persisting credentials first
//! - Refresh-token grant with fallback to the stored credentials
//! - Background chain that reschedules itself after every attempt
//! - Access token hand-out for API adapters

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use greenwindow_common::time::{format_duration, sleep_or_cancel};
use greenwindow_domain::{refresh_delay, Credentials, GreenWindowError, Result, Session};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ports::{load_credentials, save_credentials, AccessTokenProvider, SettingsStore, TokenEndpoint};

/// How a refresh cycle obtained its new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Refresh-token grant succeeded.
    Refreshed,
    /// Refresh failed; a password grant with stored credentials succeeded.
    Reauthenticated,
}

/// Owner of the single OAuth2 session of a device.
pub struct TokenLifecycleManager {
    endpoint: Arc<dyn TokenEndpoint>,
    settings: Arc<dyn SettingsStore>,
    session: RwLock<Option<Session>>,
}

impl TokenLifecycleManager {
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { endpoint, settings, session: RwLock::new(None) }
    }

    /// Persist `credentials`, then exchange them for a session.
    ///
    /// Credentials are written even when the provider rejects them so the
    /// refresh chain can keep trying with what the user last entered.
    ///
    /// # Errors
    /// - `GreenWindowError::Storage` if settings cannot be written
    /// - `GreenWindowError::Auth` if the provider rejects the credentials
    pub async fn authenticate_with_credentials(&self, credentials: &Credentials) -> Result<()> {
        save_credentials(self.settings.as_ref(), credentials).await?;

        let session = self.endpoint.password_grant(credentials).await?;
        info!(
            username = %credentials.username,
            expires_in = ?session.expires_in,
            "Authenticated with credentials"
        );
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Current session (without refreshing)
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Delay before the next refresh, derived from the held session.
    pub async fn next_refresh_delay(&self) -> Duration {
        let expires_in = self.session.read().await.as_ref().and_then(|s| s.expires_in);
        refresh_delay(expires_in)
    }

    /// Run one refresh cycle: refresh grant, else credential fallback.
    ///
    /// # Errors
    /// Returns the fallback's error when both paths fail. The held session
    /// is left untouched in that case.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        match self.refresh_with_token().await {
            Ok(()) => Ok(RefreshOutcome::Refreshed),
            Err(refresh_error) => {
                warn!(error = %refresh_error, "Token refresh failed, re-authenticating with stored credentials");
                self.reauthenticate().await?;
                Ok(RefreshOutcome::Reauthenticated)
            }
        }
    }

    async fn refresh_with_token(&self) -> Result<()> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or_else(|| GreenWindowError::Auth("No refresh token available".to_string()))?;

        let mut renewed = self.endpoint.refresh_grant(&refresh_token).await?;
        if renewed.refresh_token.is_none() {
            renewed.refresh_token = Some(refresh_token);
        }

        debug!(expires_in = ?renewed.expires_in, "Refresh grant succeeded");
        *self.session.write().await = Some(renewed);
        Ok(())
    }

    async fn reauthenticate(&self) -> Result<()> {
        let credentials = load_credentials(self.settings.as_ref())
            .await?
            .ok_or_else(|| GreenWindowError::Auth("No stored credentials".to_string()))?;

        let session = self.endpoint.password_grant(&credentials).await?;
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Keep the session alive until `cancel` fires.
    ///
    /// Sleeps for [`Self::next_refresh_delay`], runs [`Self::refresh`], logs
    /// the result and starts over. A failed cycle never ends the chain; the
    /// next delay is computed from whatever session is held (or the default
    /// expiry when there is none).
    pub async fn run_refresh_loop(self: Arc<Self>, cancel: CancellationToken) {
        info!("Starting token refresh chain");

        loop {
            let delay = self.next_refresh_delay().await;
            info!(
                refresh_in_secs = delay.as_secs(),
                "Next token refresh in {}",
                format_duration(delay)
            );

            if sleep_or_cancel(delay, &cancel).await.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                outcome = self.refresh() => outcome,
            };

            match outcome {
                Ok(outcome) => info!(?outcome, "Token refresh cycle completed"),
                Err(e) => error!(
                    error = %e,
                    kind = e.kind(),
                    "Token refresh and credential fallback failed, retrying next cycle"
                ),
            }
        }

        info!("Token refresh chain stopped");
    }
}

#[async_trait]
impl AccessTokenProvider for TokenLifecycleManager {
    async fn access_token(&self) -> Result<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or_else(|| GreenWindowError::Auth("No access token held".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testing::{MemorySettingsStore, ScriptedTokenEndpoint};

    fn session(access: &str, refresh: Option<&str>, expires_in: Option<i64>) -> Session {
        Session {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_in,
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn access_token_requires_session() {
        let manager = TokenLifecycleManager::new(
            Arc::new(ScriptedTokenEndpoint::new()),
            Arc::new(MemorySettingsStore::new()),
        );
        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, GreenWindowError::Auth(_)));
    }

    #[tokio::test]
    async fn refresh_delay_tracks_held_session() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::new());
        endpoint.push_password(Ok(session("a1", Some("r1"), Some(3600))));
        let manager = TokenLifecycleManager::new(endpoint, Arc::new(MemorySettingsStore::new()));

        assert_eq!(manager.next_refresh_delay().await, Duration::from_secs(675));
        manager.authenticate_with_credentials(&Credentials::new("u", "p")).await.unwrap();
        assert_eq!(manager.next_refresh_delay().await, Duration::from_secs(2700));
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_omitted() {
        let endpoint = Arc::new(ScriptedTokenEndpoint::new());
        endpoint.push_password(Ok(session("a1", Some("r1"), Some(300))));
        endpoint.push_refresh(Ok(session("a2", None, Some(300))));
        let manager = TokenLifecycleManager::new(endpoint.clone(), Arc::new(MemorySettingsStore::new()));

        manager.authenticate_with_credentials(&Credentials::new("u", "p")).await.unwrap();
        assert_eq!(manager.refresh().await.unwrap(), RefreshOutcome::Refreshed);

        let held = manager.session().await.unwrap();
        assert_eq!(held.access_token, "a2");
        assert_eq!(held.refresh_token.as_deref(), Some("r1"));
        assert_eq!(endpoint.refresh_calls(), vec!["r1".to_string()]);
    }
}
