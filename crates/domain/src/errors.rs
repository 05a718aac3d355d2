//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for GreenWindow
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum GreenWindowError {
    /// Missing or undecodable token, or the provider rejected credentials.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Response shape violates the expected schema.
    #[error("Data error: {0}")]
    Data(String),

    /// Non-2xx HTTP response with the message extracted from its body.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network failure or 5xx response.
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GreenWindowError {
    /// Whether a remote call failing with this error may be attempted again.
    ///
    /// Every `Api` status counts, 4xx included.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Api { .. })
    }

    /// Short label for structured log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Data(_) => "data",
            Self::Api { .. } => "api",
            Self::Transient(_) => "transient",
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for GreenWindow operations
pub type Result<T> = std::result::Result<T, GreenWindowError>;
