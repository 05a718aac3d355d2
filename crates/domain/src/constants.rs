//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Polling cadences
pub const GREENEST_MOMENT_SYNC_INTERVAL_SECS: u64 = 1800;
pub const ALARM_EVALUATION_INTERVAL_SECS: u64 = 10;

// Token refresh scheduling
pub const DEFAULT_TOKEN_EXPIRES_IN_SECS: i64 = 900;
pub const MIN_REFRESH_DELAY_SECS: u64 = 60;
pub const REFRESH_LEAD_FACTOR: f64 = 0.75;

// Retry executor
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_SECS: u64 = 2;

// Remote API
pub const GREENEST_WINDOW_SIZE: &str = "3H";

// Device store keys
pub const STORE_USER_ID: &str = "userId";
pub const STORE_ORGANIZATION_ID: &str = "organizationId";
pub const STORE_GREENEST_MOMENT: &str = "greenestMoment";

// Storage files under `storage.data_dir`
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEVICE_STORE_FILE_NAME: &str = "device.json";

// Settings keys
pub const SETTINGS_USERNAME: &str = "username";
pub const SETTINGS_PASSWORD: &str = "password";

// Query surface defaults when no device exists
pub const NO_DEVICE_DISPLAY: &str = "No device found";
pub const NO_DEVICE_PERCENTAGE: u8 = 0;
pub const NO_DEVICE_ALARM: bool = false;

// Flow condition
pub const CONDITION_GREENEST_MOMENT_NOW: &str = "greenest_moment_now";

pub const DEVICE_NAME: &str = "Vandebron";
