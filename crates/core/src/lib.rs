//! # GreenWindow Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for every host collaborator
//! - The OAuth2 session lifecycle (refresh chain with credential fallback)
//! - Greenest-moment derivations: display string, edge-triggered alarm
//! - Pairing and the read-only query surface
//!
//! ## Architecture Principles
//! - Only depends on `greenwindow-common` and `greenwindow-domain`
//! - No HTTP, filesystem, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod device;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use device::ports::{CapabilitySink, Clock, DeviceStore, GreenEnergyApi};
pub use device::{AlarmUpdate, DevicePairing, DeviceRegistry, GreenestMomentService};
pub use session::ports::{AccessTokenProvider, SettingsStore, TokenEndpoint};
pub use session::{RefreshOutcome, TokenLifecycleManager};
