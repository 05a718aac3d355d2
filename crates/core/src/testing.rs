//! In-memory port implementations for tests
//!
//! Available under `cfg(test)` and the `test-utils` feature so downstream
//! crates can drive core services without a host platform.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use greenwindow_domain::{
    Capability, CapabilityEvent, CapabilityValue, Credentials, GreenWindowError, GreenestMomentWindow,
    Result, Session,
};
use parking_lot::Mutex;
use serde_json::Value;

use crate::device::ports::{CapabilitySink, Clock, DeviceStore, GreenEnergyApi};
use crate::session::ports::{SettingsStore, TokenEndpoint};

/// Clock whose time only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    timezone: Tz,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self { now: Mutex::new(now), timezone }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Device store backed by a map.
#[derive(Default)]
pub struct MemoryDeviceStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: Mutex<bool>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Make every subsequent `set` fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(GreenWindowError::Storage(format!("write to '{key}' refused")));
        }
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings store backed by a map.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: &Credentials) -> Self {
        let store = Self::new();
        {
            let mut values = store.values.lock();
            values.insert("username".to_string(), credentials.username.clone());
            values.insert("password".to_string(), credentials.password.clone());
        }
        store
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Capability sink that records every realtime event.
#[derive(Default)]
pub struct RecordingCapabilities {
    values: Mutex<HashMap<Capability, CapabilityValue>>,
    events: Mutex<Vec<CapabilityEvent>>,
}

impl RecordingCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value without emitting an event.
    pub fn preset(&self, capability: Capability, value: CapabilityValue) {
        self.values.lock().insert(capability, value);
    }

    pub fn events(&self) -> Vec<CapabilityEvent> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, capability: Capability) -> Vec<CapabilityValue> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.capability == capability)
            .map(|e| e.value.clone())
            .collect()
    }
}

#[async_trait]
impl CapabilitySink for RecordingCapabilities {
    fn value(&self, capability: Capability) -> Option<CapabilityValue> {
        self.values.lock().get(&capability).cloned()
    }

    async fn set_value(&self, capability: Capability, value: CapabilityValue) -> Result<()> {
        self.values.lock().insert(capability, value);
        Ok(())
    }

    async fn publish_realtime(&self, capability: Capability, value: CapabilityValue) -> Result<()> {
        self.events.lock().push(CapabilityEvent { capability, value });
        Ok(())
    }
}

/// Token endpoint answering from queued results.
///
/// An empty queue answers with an auth error.
#[derive(Default)]
pub struct ScriptedTokenEndpoint {
    password: Mutex<VecDeque<Result<Session>>>,
    refresh: Mutex<VecDeque<Result<Session>>>,
    password_calls: Mutex<Vec<String>>,
    refresh_calls: Mutex<Vec<String>>,
}

impl ScriptedTokenEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_password(&self, result: Result<Session>) {
        self.password.lock().push_back(result);
    }

    pub fn push_refresh(&self, result: Result<Session>) {
        self.refresh.lock().push_back(result);
    }

    /// Usernames seen by the password grant.
    pub fn password_calls(&self) -> Vec<String> {
        self.password_calls.lock().clone()
    }

    /// Refresh tokens seen by the refresh grant.
    pub fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.lock().clone()
    }
}

#[async_trait]
impl TokenEndpoint for ScriptedTokenEndpoint {
    async fn password_grant(&self, credentials: &Credentials) -> Result<Session> {
        self.password_calls.lock().push(credentials.username.clone());
        self.password
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GreenWindowError::Auth("invalid_grant".to_string())))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<Session> {
        self.refresh_calls.lock().push(refresh_token.to_string());
        self.refresh
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GreenWindowError::Auth("invalid_grant".to_string())))
    }
}

/// Energy API returning configurable results and counting calls.
pub struct ScriptedEnergyApi {
    user_id: Mutex<Result<String>>,
    organization_id: Mutex<Result<String>>,
    window: Mutex<Result<GreenestMomentWindow>>,
    percentage: Mutex<Result<u8>>,
    window_calls: AtomicUsize,
    percentage_calls: AtomicUsize,
}

impl ScriptedEnergyApi {
    pub fn new(window: GreenestMomentWindow, percentage: u8) -> Self {
        Self {
            user_id: Mutex::new(Ok("user-1".to_string())),
            organization_id: Mutex::new(Ok("org-1".to_string())),
            window: Mutex::new(Ok(window)),
            percentage: Mutex::new(Ok(percentage)),
            window_calls: AtomicUsize::new(0),
            percentage_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_user_id(&self, result: Result<String>) {
        *self.user_id.lock() = result;
    }

    pub fn set_organization_id(&self, result: Result<String>) {
        *self.organization_id.lock() = result;
    }

    pub fn set_window(&self, result: Result<GreenestMomentWindow>) {
        *self.window.lock() = result;
    }

    pub fn set_percentage(&self, result: Result<u8>) {
        *self.percentage.lock() = result;
    }

    pub fn window_calls(&self) -> usize {
        self.window_calls.load(Ordering::SeqCst)
    }

    pub fn percentage_calls(&self) -> usize {
        self.percentage_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GreenEnergyApi for ScriptedEnergyApi {
    async fn resolve_user_id(&self) -> Result<String> {
        self.user_id.lock().clone()
    }

    async fn resolve_organization_id(&self, _user_id: &str) -> Result<String> {
        self.organization_id.lock().clone()
    }

    async fn fetch_greenest_moment_window(&self, _organization_id: &str) -> Result<GreenestMomentWindow> {
        self.window_calls.fetch_add(1, Ordering::SeqCst);
        self.window.lock().clone()
    }

    async fn fetch_green_energy_percentage(&self, _organization_id: &str) -> Result<u8> {
        self.percentage_calls.fetch_add(1, Ordering::SeqCst);
        self.percentage.lock().clone()
    }
}
