//! OAuth2 token endpoint adapter
//!
//! Password and refresh grants against the provider's Keycloak realm. Calls
//! are sent once: retry and fallback policy live in the session manager.

use std::sync::Arc;

use async_trait::async_trait;
use greenwindow_core::{Clock, TokenEndpoint};
use greenwindow_domain::{Credentials, GreenWindowError, OAuthConfig, Result, Session};
use reqwest::header::ACCEPT;
use reqwest::Method;
use tracing::{debug, instrument, warn};
use url::Url;

use super::errors::token_error;
use super::types::TokenResponse;
use crate::http::HttpClient;

/// Token endpoint client
pub struct OAuthTokenClient {
    http: HttpClient,
    token_url: Url,
    client_id: String,
    client_secret: Option<String>,
    scope: String,
    clock: Arc<dyn Clock>,
}

impl OAuthTokenClient {
    /// # Errors
    /// Returns `GreenWindowError::Config` if the token URL does not parse.
    pub fn new(config: &OAuthConfig, http: HttpClient, clock: Arc<dyn Clock>) -> Result<Self> {
        let token_url = Url::parse(&config.token_url).map_err(|e| {
            GreenWindowError::Config(format!("Invalid oauth.token_url '{}': {e}", config.token_url))
        })?;
        Ok(Self {
            http,
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scopes.join(" "),
            clock,
        })
    }

    async fn request_token(&self, grant_type: &str, mut form: Vec<(&str, String)>) -> Result<Session> {
        form.push(("grant_type", grant_type.to_string()));
        form.push(("client_id", self.client_id.clone()));
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let request = self
            .http
            .request(Method::POST, self.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&form);

        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = token_error(status, &body);
            warn!(%status, grant_type, error = %error, "Token request rejected");
            return Err(error);
        }

        let body = response.text().await.unwrap_or_default();
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GreenWindowError::Auth(format!("Token response could not be decoded: {e}")))?;

        debug!(grant_type, expires_in = ?token.expires_in, "Token issued");
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            issued_at: self.clock.now(),
        })
    }
}

#[async_trait]
impl TokenEndpoint for OAuthTokenClient {
    #[instrument(skip_all)]
    async fn password_grant(&self, credentials: &Credentials) -> Result<Session> {
        let form = vec![
            ("username", credentials.username.clone()),
            ("password", credentials.password.clone()),
            ("scope", self.scope.clone()),
        ];
        self.request_token("password", form).await
    }

    #[instrument(skip_all)]
    async fn refresh_grant(&self, refresh_token: &str) -> Result<Session> {
        self.request_token("refresh_token", vec![("refresh_token", refresh_token.to_string())]).await
    }
}
