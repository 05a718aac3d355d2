//! Conversions from external infrastructure errors into domain errors.

use greenwindow_domain::GreenWindowError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub GreenWindowError);

impl From<InfraError> for GreenWindowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GreenWindowError> for InfraError {
    fn from(value: GreenWindowError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoGreenWindowError {
    fn into_greenwindow(self) -> GreenWindowError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → GreenWindowError */
/* -------------------------------------------------------------------------- */

impl IntoGreenWindowError for HttpError {
    fn into_greenwindow(self) -> GreenWindowError {
        if self.is_timeout() {
            return GreenWindowError::Transient("HTTP request timed out".into());
        }

        if self.is_connect() {
            return GreenWindowError::Transient("HTTP connection failure".into());
        }

        if self.is_decode() {
            return GreenWindowError::Data(format!("response body could not be decoded: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("{} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                500..=599 => GreenWindowError::Transient(message),
                _ => GreenWindowError::Api { status: code, message },
            };
        }

        if self.is_builder() {
            return GreenWindowError::Internal(format!("invalid HTTP request: {self}"));
        }

        GreenWindowError::Transient(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_greenwindow())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → GreenWindowError */
/* -------------------------------------------------------------------------- */

impl IntoGreenWindowError for serde_json::Error {
    fn into_greenwindow(self) -> GreenWindowError {
        GreenWindowError::Data(format!("invalid JSON: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_greenwindow())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → GreenWindowError */
/* -------------------------------------------------------------------------- */

impl IntoGreenWindowError for std::io::Error {
    fn into_greenwindow(self) -> GreenWindowError {
        GreenWindowError::Storage(format!("{:?}: {self}", self.kind()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_greenwindow())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → GreenWindowError */
/* -------------------------------------------------------------------------- */

impl IntoGreenWindowError for toml::de::Error {
    fn into_greenwindow(self) -> GreenWindowError {
        GreenWindowError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_greenwindow())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
