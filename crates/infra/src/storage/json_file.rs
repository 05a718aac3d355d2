//! JSON-file key/value store
//!
//! One object per file, loaded on open and rewritten on every `set`. Writes
//! go to a sibling temp file first and are renamed into place, so a crash
//! never leaves a half-written store behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use greenwindow_core::{DeviceStore, SettingsStore};
use greenwindow_domain::{GreenWindowError, Result};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::InfraError;

/// File-backed store usable as both device store and settings store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Storage` if the file cannot be read and
    /// `GreenWindowError::Data` if it is not a JSON object.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes).map_err(InfraError::from)? {
                Value::Object(map) => map,
                other => {
                    return Err(GreenWindowError::Data(format!(
                        "{} holds {} instead of an object",
                        path.display(),
                        json_kind(&other)
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(InfraError::from(e).into()),
        };
        debug!(path = %path.display(), keys = values.len(), "Opened JSON store");
        Ok(Self { path, values: Mutex::new(values) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_value(&self, key: &str) -> Option<Value> {
        self.values.lock().await.get(key).cloned()
    }

    async fn write_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().await;
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.persist(&values).await {
            // Keep memory in step with disk.
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }
        let bytes = serde_json::to_vec_pretty(values).map_err(InfraError::from)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(InfraError::from)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(InfraError::from)?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_value(key).await)
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.write_value(key, value).await
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.read_value(key).await {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write_value(key, Value::String(value.to_string())).await
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("device.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        DeviceStore::set(&store, "organizationId", json!("org-1")).await.unwrap();
        DeviceStore::set(&store, "greenestMoment", json!({ "windowStart": "2024-05-01T11:00:00Z" }))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(DeviceStore::get(&reopened, "organizationId").await.unwrap(), Some(json!("org-1")));
        assert_eq!(
            DeviceStore::get(&reopened, "greenestMoment").await.unwrap(),
            Some(json!({ "windowStart": "2024-05-01T11:00:00Z" }))
        );
        assert!(!dir.path().join("nested").join("device.json.tmp").exists());
    }

    #[tokio::test]
    async fn settings_are_plain_strings() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("settings.json")).await.unwrap();

        SettingsStore::set(&store, "username", "jan@example.nl").await.unwrap();

        assert_eq!(
            SettingsStore::get(&store, "username").await.unwrap().as_deref(),
            Some("jan@example.nl")
        );
        assert_eq!(SettingsStore::get(&store, "password").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_and_blank_files_start_empty() {
        let dir = TempDir::new().unwrap();
        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "  \n").unwrap();

        let store = JsonFileStore::open(&blank).await.unwrap();
        assert_eq!(DeviceStore::get(&store, "anything").await.unwrap(), None);

        let store = JsonFileStore::open(dir.path().join("absent.json")).await.unwrap();
        assert_eq!(DeviceStore::get(&store, "anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_object_file_is_data_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, GreenWindowError::Data(_)), "got {err:?}");
    }
}
