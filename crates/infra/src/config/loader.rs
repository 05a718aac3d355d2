//! Configuration loader
//!
//! Loads application configuration from a file, then applies environment
//! overrides.
//!
//! ## Loading Strategy
//! 1. Reads `.env` from the working directory if present (`dotenvy`)
//! 2. Loads the file named by `GREENWINDOW_CONFIG`, else the first probed
//!    path, else starts from defaults
//! 3. Applies environment overrides
//! 4. Validates the result
//!
//! ## Environment Variables
//! - `GREENWINDOW_CONFIG`: Explicit config file path
//! - `GREENWINDOW_API_BASE_URL`: Energy API base URL
//! - `GREENWINDOW_TOKEN_URL`: OAuth2 token endpoint
//! - `GREENWINDOW_CLIENT_ID` / `GREENWINDOW_CLIENT_SECRET`: OAuth2 client
//! - `GREENWINDOW_TIMEZONE`: IANA timezone for display and "today"
//! - `GREENWINDOW_DATA_DIR`: Directory holding `settings.json` and `device.json`
//! - `GREENWINDOW_LOG_LEVEL`: Tracing filter directive
//! - `GREENWINDOW_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./greenwindow.toml` or `./greenwindow.json`
//! 2. `./config/greenwindow.toml` or `./config/greenwindow.json`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use greenwindow_domain::{Config, GreenWindowError, Result};
use url::Url;

use crate::errors::InfraError;

const CONFIG_PATH_VAR: &str = "GREENWINDOW_CONFIG";
const CONFIG_FILE_NAMES: [&str; 2] = ["greenwindow.toml", "greenwindow.json"];

/// Load configuration with the full fallback strategy
///
/// # Errors
/// Returns `GreenWindowError::Config` if:
/// - `GREENWINDOW_CONFIG` names a missing file
/// - File format is invalid
/// - An override or the merged result fails validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let config = match std::env::var(CONFIG_PATH_VAR).ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::info!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    let config = load_from_env(config)?;
    validate(&config)?;
    Ok(config)
}

/// Apply environment overrides on top of `base`
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `GreenWindowError::Config` if an override is empty.
pub fn load_from_env(mut base: Config) -> Result<Config> {
    if let Some(url) = env_var("GREENWINDOW_API_BASE_URL")? {
        base.api.base_url = url;
    }
    if let Some(url) = env_var("GREENWINDOW_TOKEN_URL")? {
        base.oauth.token_url = url;
    }
    if let Some(client_id) = env_var("GREENWINDOW_CLIENT_ID")? {
        base.oauth.client_id = client_id;
    }
    if let Some(secret) = env_var("GREENWINDOW_CLIENT_SECRET")? {
        base.oauth.client_secret = Some(secret);
    }
    if let Some(timezone) = env_var("GREENWINDOW_TIMEZONE")? {
        base.device.timezone = timezone;
    }
    if let Some(dir) = env_var("GREENWINDOW_DATA_DIR")? {
        base.storage.data_dir = dir;
    }
    if let Some(level) = env_var("GREENWINDOW_LOG_LEVEL")? {
        base.logging.level = level;
    }
    base.logging.json = env_bool("GREENWINDOW_LOG_JSON", base.logging.json);
    Ok(base)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports both JSON
/// and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `GreenWindowError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GreenWindowError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GreenWindowError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GreenWindowError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GreenWindowError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(GreenWindowError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Domain validation plus URL syntax.
///
/// # Errors
/// Returns `GreenWindowError::Config` naming the first invalid field.
pub fn validate(config: &Config) -> Result<()> {
    config.validate()?;
    for (field, value) in [("api.base_url", &config.api.base_url), ("oauth.token_url", &config.oauth.token_url)] {
        Url::parse(value)
            .map_err(|e| GreenWindowError::Config(format!("Invalid {field} '{value}': {e}")))?;
    }
    Ok(())
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join("config"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Non-empty environment variable, if set
///
/// # Errors
/// Returns `GreenWindowError::Config` if the variable is set but blank.
fn env_var(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => {
            Err(GreenWindowError::Config(format!("Environment variable {key} is empty")))
        }
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
