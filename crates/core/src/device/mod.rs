//! Greenest-moment device logic
//!
//! - [`service`]: sync operations and the derived display/alarm state
//! - [`pairing`]: first-run authentication and identity resolution
//! - [`queries`]: read-only surface for widgets and flow conditions

pub mod pairing;
pub mod ports;
pub mod queries;
pub mod service;

pub use pairing::{seed_device_store, DevicePairing};
pub use queries::DeviceRegistry;
pub use service::{AlarmUpdate, GreenestMomentService};
