//! Energy API client with bounded retries
//!
//! Every GET runs inside the shared [`RetryExecutor`]. Transient and API
//! failures are retried with exponential backoff; authentication and
//! schema errors surface immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use greenwindow_common::resilience::{RetryConfig, RetryDecision, RetryExecutor, RetryPolicy};
use greenwindow_common::time::local_date;
use greenwindow_core::{AccessTokenProvider, Clock, GreenEnergyApi};
use greenwindow_domain::constants::GREENEST_WINDOW_SIZE;
use greenwindow_domain::{
    closest_forecast_entry, Config, GreenWindowError, GreenestMomentWindow, Result, RetrySettings,
};
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use super::errors::status_error;
use super::jwt::user_id_from_token;
use super::types::{ForecastResponse, ProductGroupsResponse};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Cap on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Configuration for the energy API client
#[derive(Debug, Clone)]
pub struct EnergyApiConfig {
    /// Base URL, e.g. `https://mijn.vandebron.nl/api/v1`
    pub base_url: Url,
    /// Timeout for a single request
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl EnergyApiConfig {
    /// # Errors
    /// Returns `GreenWindowError::Config` if the base URL does not parse.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            GreenWindowError::Config(format!("Invalid api.base_url '{}': {e}", config.api.base_url))
        })?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(config.api.timeout_secs),
            retry: retry_config(&config.retry)?,
        })
    }
}

/// Executor settings for the configured retry budget.
///
/// # Errors
/// Returns `GreenWindowError::Config` for an unusable budget.
pub fn retry_config(settings: &RetrySettings) -> Result<RetryConfig> {
    RetryConfig::builder()
        .max_retries(settings.max_retries)
        .exponential_backoff(Duration::from_secs(settings.initial_backoff_secs), 2.0, MAX_BACKOFF)
        .build()
        .map_err(|e| GreenWindowError::Config(e.to_string()))
}

/// Retries errors the domain marks as retryable.
///
/// Any non-2xx API status is retried, 4xx included: the provider answers
/// 4xx while its backend is briefly unavailable, and a request rejected for
/// good costs at most `max_retries` extra calls. Auth, data and config
/// failures stop immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryableErrors;

impl RetryPolicy<GreenWindowError> for RetryableErrors {
    fn should_retry(&self, error: &GreenWindowError, _attempt: u32) -> RetryDecision {
        if error.is_retryable() {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// Typed client for the greenest-moment endpoints
pub struct EnergyApiClient {
    http: HttpClient,
    auth: Arc<dyn AccessTokenProvider>,
    clock: Arc<dyn Clock>,
    config: EnergyApiConfig,
    retry: RetryExecutor<RetryableErrors>,
}

impl EnergyApiClient {
    /// Create a new client.
    ///
    /// `cancel` aborts backoff sleeps; pass the device's token so teardown
    /// does not wait out a pending retry.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        config: EnergyApiConfig,
        auth: Arc<dyn AccessTokenProvider>,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.timeout).build()?;
        let retry = RetryExecutor::new(config.retry.clone(), RetryableErrors).with_cancellation(cancel);
        Ok(Self { http, auth, clock, config, retry })
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> EnergyApiClientBuilder {
        EnergyApiClientBuilder::default()
    }

    pub const fn config(&self) -> &EnergyApiConfig {
        &self.config
    }

    /// Execute a GET request with retries and decode the JSON body.
    #[instrument(skip(self, query), fields(path = %segments.join("/")))]
    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(segments)?;
        self.retry.execute(|| self.get_once(&url, query)).await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url, query: &[(&str, String)]) -> Result<T> {
        // Fetched per attempt so a refresh between retries is picked up.
        let token = self.auth.access_token().await?;

        let request = self
            .http
            .request(Method::GET, url.clone())
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .query(query);

        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.bytes().await.map_err(|e| GreenWindowError::from(InfraError::from(e)))?;
        serde_json::from_slice(&body).map_err(|e| InfraError::from(e).into())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GreenWindowError::Config(format!("{} cannot be a base URL", self.config.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn forecast_date(&self) -> String {
        local_date(self.clock.now(), self.clock.timezone()).format("%Y-%m-%d").to_string()
    }
}

#[async_trait]
impl GreenEnergyApi for EnergyApiClient {
    async fn resolve_user_id(&self) -> Result<String> {
        let token = self.auth.access_token().await?;
        user_id_from_token(&token)
    }

    async fn resolve_organization_id(&self, user_id: &str) -> Result<String> {
        let response: ProductGroupsResponse =
            self.get(&["customers", user_id, "productGroups"], &[]).await?;
        let organization_id = response.first_organization_id()?;
        debug!(%organization_id, "Resolved organization");
        Ok(organization_id)
    }

    async fn fetch_greenest_moment_window(&self, organization_id: &str) -> Result<GreenestMomentWindow> {
        let query = [("forecastDate", self.forecast_date()), ("windowSize", GREENEST_WINDOW_SIZE.to_string())];
        let window: GreenestMomentWindow = self
            .get(&["energyConsumers", organization_id, "greenEnergyMix", "window"], &query)
            .await?;
        info!(start = %window.window_start, end = %window.window_end, "Fetched greenest moment window");
        Ok(window)
    }

    async fn fetch_green_energy_percentage(&self, organization_id: &str) -> Result<u8> {
        let query = [("forecastDate", self.forecast_date())];
        let response: ForecastResponse = self
            .get(&["energyConsumers", organization_id, "greenEnergyMix", "forecast"], &query)
            .await?;

        let now = self.clock.now();
        let entry = closest_forecast_entry(&response.data, now)
            .ok_or_else(|| GreenWindowError::Data("Forecast contains no entries".to_string()))?;
        let percentage = entry.rounded_percentage();
        info!(percentage, entry_time = %entry.time, "Fetched green energy percentage");
        Ok(percentage)
    }
}

/// Builder for [`EnergyApiClient`]
#[derive(Default)]
pub struct EnergyApiClientBuilder {
    config: Option<EnergyApiConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    clock: Option<Arc<dyn Clock>>,
    cancel: Option<CancellationToken>,
}

impl EnergyApiClientBuilder {
    pub fn config(mut self, config: EnergyApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// # Errors
    /// Returns `GreenWindowError::Config` when a required part is missing.
    pub fn build(self) -> Result<EnergyApiClient> {
        let config = match self.config {
            Some(config) => config,
            None => EnergyApiConfig::from_config(&Config::default())?,
        };
        let auth = self
            .auth
            .ok_or_else(|| GreenWindowError::Config("Access token provider not set".to_string()))?;
        let clock = self.clock.ok_or_else(|| GreenWindowError::Config("Clock not set".to_string()))?;
        EnergyApiClient::new(config, auth, clock, self.cancel.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_four_attempts() {
        let config = EnergyApiConfig::from_config(&Config::default()).unwrap();
        assert_eq!(config.retry.max_attempts(), 4);
        assert_eq!(config.retry.backoff.calculate_delay(0), Duration::from_secs(2));
        assert_eq!(config.retry.backoff.calculate_delay(2), Duration::from_secs(8));
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(EnergyApiConfig::from_config(&config), Err(GreenWindowError::Config(_))));
    }

    #[test]
    fn policy_follows_domain_classification() {
        let policy = RetryableErrors;
        assert_eq!(
            policy.should_retry(&GreenWindowError::Transient("reset".into()), 0),
            RetryDecision::Retry
        );
        assert_eq!(
            policy.should_retry(&GreenWindowError::Api { status: 404, message: "x".into() }, 0),
            RetryDecision::Retry
        );
        assert_eq!(policy.should_retry(&GreenWindowError::Data("x".into()), 0), RetryDecision::Stop);
        assert_eq!(policy.should_retry(&GreenWindowError::Auth("x".into()), 0), RetryDecision::Stop);
    }
}
