//! OAuth2 session ownership
//!
//! The [`TokenLifecycleManager`] holds the single session of a device,
//! hands its access token to API adapters and keeps it alive with a
//! self-rescheduling refresh chain.

pub mod manager;
pub mod ports;

pub use manager::{RefreshOutcome, TokenLifecycleManager};
pub use ports::{load_credentials, save_credentials, AccessTokenProvider, SettingsStore, TokenEndpoint};
