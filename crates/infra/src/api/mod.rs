//! Remote energy provider adapters
//!
//! - [`client`]: greenest-window, forecast and identity endpoints, retried
//! - [`oauth`]: password and refresh grants, sent once
//! - [`errors`]: non-2xx message extraction
//! - [`jwt`]: unverified access-token claims

pub mod client;
pub mod errors;
pub mod jwt;
pub mod oauth;
pub mod types;

pub use client::{retry_config, EnergyApiClient, EnergyApiClientBuilder, EnergyApiConfig, RetryableErrors};
pub use errors::extract_error_message;
pub use oauth::OAuthTokenClient;
