//! Configuration structures

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ALARM_EVALUATION_INTERVAL_SECS, DEFAULT_INITIAL_BACKOFF_SECS, DEFAULT_MAX_RETRIES,
    DEVICE_STORE_FILE_NAME, GREENEST_MOMENT_SYNC_INTERVAL_SECS, SETTINGS_FILE_NAME,
};
use crate::{GreenWindowError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub oauth: OAuthConfig,
    pub device: DeviceConfig,
    pub retry: RetrySettings,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values that serde cannot express.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.device.timezone()?;
        if self.device.sync_interval_secs == 0 {
            return Err(GreenWindowError::Config("device.sync_interval_secs must be > 0".into()));
        }
        if self.device.alarm_interval_secs == 0 {
            return Err(GreenWindowError::Config("device.alarm_interval_secs must be > 0".into()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(GreenWindowError::Config("api.base_url must not be empty".into()));
        }
        if self.oauth.client_id.trim().is_empty() {
            return Err(GreenWindowError::Config("oauth.client_id must not be empty".into()));
        }
        Ok(())
    }
}

/// Remote energy API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: "https://mijn.vandebron.nl/api/v1".to_string(), timeout_secs: 30 }
    }
}

/// OAuth2 token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            token_url: "https://vandebron.nl/auth/realms/vandebron/protocol/openid-connect/token"
                .to_string(),
            client_id: "website".to_string(),
            client_secret: None,
            scopes: vec!["profile".to_string(), "email".to_string()],
        }
    }
}

/// Per-device polling behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// IANA timezone used for the display string and "today".
    pub timezone: String,
    pub sync_interval_secs: u64,
    pub alarm_interval_secs: u64,
}

impl DeviceConfig {
    /// Parsed timezone.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Config` for an unknown IANA name.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| GreenWindowError::Config(format!("Invalid timezone '{}': {e}", self.timezone)))
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub const fn alarm_interval(&self) -> Duration {
        Duration::from_secs(self.alarm_interval_secs)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Amsterdam".to_string(),
            sync_interval_secs: GREENEST_MOMENT_SYNC_INTERVAL_SECS,
            alarm_interval_secs: ALARM_EVALUATION_INTERVAL_SECS,
        }
    }
}

/// Retry budget for remote calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, initial_backoff_secs: DEFAULT_INITIAL_BACKOFF_SECS }
    }
}

/// Durable stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl StorageConfig {
    /// Global settings file (credentials).
    pub fn settings_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(SETTINGS_FILE_NAME)
    }

    /// Per-device store file.
    pub fn device_store_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(DEVICE_STORE_FILE_NAME)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: "./data".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.sync_interval(), Duration::from_secs(1800));
        assert_eq!(config.device.alarm_interval(), Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.storage.settings_path(), Path::new("./data/settings.json"));
        assert_eq!(config.storage.device_store_path(), Path::new("./data/device.json"));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut config = Config::default();
        config.device.timezone = "Mars/Olympus_Mons".into();
        assert!(matches!(config.validate(), Err(GreenWindowError::Config(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::default();
        config.device.alarm_interval_secs = 0;
        assert!(matches!(config.validate(), Err(GreenWindowError::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "device": { "timezone": "UTC" } }"#).unwrap();
        assert_eq!(config.device.timezone, "UTC");
        assert_eq!(config.device.sync_interval_secs, 1800);
        assert_eq!(config.oauth.scopes, vec!["profile", "email"]);
    }
}
