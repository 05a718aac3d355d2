//! # GreenWindow Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP adapters for the energy API and its OAuth2 token endpoint
//! - JSON-file settings and device stores, the capability board
//! - Configuration loading (file + environment)
//! - The device scheduler driving the periodic tasks
//!
//! ## Architecture
//! - Implements traits defined in `greenwindow-core`
//! - Depends on `greenwindow-common` and `greenwindow-core`
//! - Contains all "impure" code (network, filesystem, timers)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod platform;
pub mod scheduling;
pub mod storage;

// Re-export commonly used items
pub use api::{EnergyApiClient, OAuthTokenClient};
pub use errors::InfraError;
pub use http::HttpClient;
pub use platform::SystemClock;
pub use scheduling::{DeviceScheduler, SchedulerError, SchedulerResult};
pub use storage::{CapabilityBoard, JsonFileStore};
