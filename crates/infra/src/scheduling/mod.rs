//! Scheduling infrastructure for the device's background work
//!
//! [`DeviceScheduler`] owns the three timers of a paired device: the token
//! refresh chain, the slow greenest-moment sync and the fast alarm check.
//!
//! - Explicit lifecycle management (start/stop)
//! - Join handle for the spawned driver task
//! - One cancellation token shared with the API client's backoff sleeps
//! - Timeout on join during stop

pub mod device_scheduler;
pub mod error;

pub use device_scheduler::{DeviceScheduler, DeviceSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
