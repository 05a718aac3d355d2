//! Mapping of non-2xx responses onto domain errors
//!
//! The provider reports failures in several body shapes (OAuth2 error
//! objects, plain `message` envelopes, empty bodies). The first non-empty
//! field wins, in the order `error`, `error_description`, `message`; without
//! one the status line is used.

use greenwindow_domain::GreenWindowError;
use reqwest::StatusCode;
use serde_json::Value;

const MESSAGE_FIELDS: [&str; 3] = ["error", "error_description", "message"];

/// Human-readable message for a failed response.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            MESSAGE_FIELDS.iter().find_map(|field| match value.get(*field) {
                Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
                _ => None,
            })
        })
        .unwrap_or_else(|| status_line(status))
}

/// Error for a failed energy API response.
///
/// 5xx is transient; everything else carries the status for the caller.
pub fn status_error(status: StatusCode, body: &str) -> GreenWindowError {
    let message = extract_error_message(status, body);
    if status.is_server_error() {
        GreenWindowError::Transient(message)
    } else {
        GreenWindowError::Api { status: status.as_u16(), message }
    }
}

/// Error for a failed token endpoint response.
///
/// 4xx is a rejected grant; 5xx is an outage and says nothing about the
/// credentials.
pub fn token_error(status: StatusCode, body: &str) -> GreenWindowError {
    let message = extract_error_message(status, body);
    if status.is_server_error() {
        GreenWindowError::Transient(message)
    } else {
        GreenWindowError::Auth(message)
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_takes_precedence() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid user credentials","message":"nope"}"#;
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, body), "invalid_grant");
    }

    #[test]
    fn falls_through_to_description_then_message() {
        let description = r#"{"error_description":"Token is not active","message":"nope"}"#;
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, description),
            "Token is not active"
        );

        let message = r#"{"error":"","message":"Customer not found"}"#;
        assert_eq!(extract_error_message(StatusCode::NOT_FOUND, message), "Customer not found");
    }

    #[test]
    fn falls_back_to_status_line() {
        assert_eq!(extract_error_message(StatusCode::BAD_GATEWAY, ""), "502 Bad Gateway");
        assert_eq!(extract_error_message(StatusCode::NOT_FOUND, "<html>"), "404 Not Found");
        assert_eq!(extract_error_message(StatusCode::FORBIDDEN, r#"{"error":42}"#), "403 Forbidden");
    }

    #[test]
    fn server_errors_are_transient() {
        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, r#"{"message":"maintenance"}"#);
        assert_eq!(err, GreenWindowError::Transient("maintenance".into()));
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_carry_status() {
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"message":"bad forecastDate"}"#);
        assert_eq!(err, GreenWindowError::Api { status: 400, message: "bad forecastDate".into() });
    }

    #[test]
    fn token_failures_are_auth_errors() {
        let err = token_error(StatusCode::UNAUTHORIZED, r#"{"error":"invalid_grant"}"#);
        assert_eq!(err, GreenWindowError::Auth("invalid_grant".into()));
    }

    #[test]
    fn token_endpoint_outage_is_transient() {
        let err = token_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err, GreenWindowError::Transient("502 Bad Gateway".into()));
    }
}
