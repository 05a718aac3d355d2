//! Core domain types

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DEFAULT_TOKEN_EXPIRES_IN_SECS, MIN_REFRESH_DELAY_SECS, REFRESH_LEAD_FACTOR};

/// OAuth2 session held for the lifetime of a device.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds, as reported by the provider.
    pub expires_in: Option<i64>,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Delay until this session should be refreshed.
    pub fn refresh_delay(&self) -> Duration {
        refresh_delay(self.expires_in)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// `max(0.75 * expires_in, 60)` seconds, with `expires_in` defaulting to 900.
pub fn refresh_delay(expires_in: Option<i64>) -> Duration {
    let expires_in = expires_in.unwrap_or(DEFAULT_TOKEN_EXPIRES_IN_SECS).max(0);
    #[allow(clippy::cast_precision_loss)]
    let lead = expires_in as f64 * REFRESH_LEAD_FACTOR;
    Duration::from_secs_f64(lead.max(MIN_REFRESH_DELAY_SECS as f64))
}

/// Username/password pair kept in durable settings for re-authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Forecasted interval of highest renewable share for the day.
///
/// Fields other than the two bounds are carried through untouched so the
/// persisted copy matches what the provider returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreenestMomentWindow {
    #[serde(deserialize_with = "flexible_timestamp")]
    pub window_start: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub window_end: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GreenestMomentWindow {
    pub fn new(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Self {
        Self { window_start, window_end, extra: serde_json::Map::new() }
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_start && now <= self.window_end
    }
}

/// One point of the green energy mix forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    #[serde(deserialize_with = "flexible_timestamp")]
    pub time: DateTime<Utc>,
    pub green_percentage: f64,
}

impl ForecastEntry {
    /// Percentage rounded to the nearest integer and clamped to 0..=100.
    pub fn rounded_percentage(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = self.green_percentage.round().clamp(0.0, 100.0) as u8;
        rounded
    }
}

/// Entry whose timestamp is closest to `now`.
///
/// Ties keep the earlier entry: a later entry only wins when it is strictly
/// closer.
pub fn closest_forecast_entry(entries: &[ForecastEntry], now: DateTime<Utc>) -> Option<&ForecastEntry> {
    entries.iter().fold(None, |closest: Option<&ForecastEntry>, entry| match closest {
        Some(current) if distance(current.time, now) <= distance(entry.time, now) => Some(current),
        _ => Some(entry),
    })
}

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> chrono::Duration {
    (a - b).abs()
}

/// Capabilities a paired device exposes to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Display string `HH:MM - HH:MM`.
    GreenestMoment,
    /// Current green energy percentage.
    MeasureGreenEnergy,
    /// Whether now falls inside the greenest window.
    AlarmGreenestMoment,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GreenestMoment => "greenest_moment",
            Self::MeasureGreenEnergy => "measure_green_energy",
            Self::AlarmGreenestMoment => "alarm_greenest_moment",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value written to a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl CapabilityValue {
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u8> for CapabilityValue {
    fn from(value: u8) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<String> for CapabilityValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Realtime notification emitted on every capability write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityEvent {
    pub capability: Capability,
    pub value: CapabilityValue,
}

/// Result of a successful pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedDevice {
    /// Device id, equal to the user id.
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub organization_id: String,
    pub greenest_moment: GreenestMomentWindow,
}

/// Accepts RFC 3339 timestamps and offset-less ones, the latter read as UTC.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}
