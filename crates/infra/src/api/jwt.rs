//! Unverified JWT payload decoding
//!
//! The access token is only read to learn who it belongs to. Its signature
//! is not checked; the provider validates it on every request anyway.

use greenwindow_domain::GreenWindowError;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    preferred_username: Option<String>,
    sub: Option<String>,
}

/// User id carried by `token`: `preferred_username`, else `sub`.
///
/// # Errors
/// Returns `GreenWindowError::Auth` if the token is not a decodable JWT or
/// carries neither claim.
pub fn user_id_from_token(token: &str) -> Result<String, GreenWindowError> {
    let claims = decode_claims(token)?;
    claims
        .preferred_username
        .filter(|name| !name.is_empty())
        .or(claims.sub.filter(|sub| !sub.is_empty()))
        .ok_or_else(|| GreenWindowError::Auth("Access token carries no user id".to_string()))
}

fn decode_claims(token: &str) -> Result<IdentityClaims, GreenWindowError> {
    // Expiry and audience belong to the provider; only the identity is read.
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<IdentityClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| GreenWindowError::Auth(format!("Failed to decode access token: {e}")))
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use super::*;

    fn signed(claims: &serde_json::Value) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(b"not-the-provider-key")).unwrap()
    }

    #[test]
    fn reads_preferred_username() {
        let token = signed(&json!({ "preferred_username": "12345", "sub": "abc-def" }));
        assert_eq!(user_id_from_token(&token).unwrap(), "12345");
    }

    #[test]
    fn falls_back_to_subject() {
        let token = signed(&json!({ "sub": "abc-def" }));
        assert_eq!(user_id_from_token(&token).unwrap(), "abc-def");
    }

    #[test]
    fn expired_token_with_audience_still_yields_identity() {
        let token = signed(&json!({
            "preferred_username": "12345",
            "aud": "account",
            "exp": 1_000_000_000
        }));
        assert_eq!(user_id_from_token(&token).unwrap(), "12345");
    }

    #[test]
    fn missing_claims_are_auth_errors() {
        let token = signed(&json!({ "email": "jan@example.nl" }));
        assert!(matches!(user_id_from_token(&token), Err(GreenWindowError::Auth(_))));
    }

    #[test]
    fn garbage_is_auth_error() {
        for token in ["", "not-a-jwt", "a.!!!.c", "a.e30"] {
            assert!(
                matches!(user_id_from_token(token), Err(GreenWindowError::Auth(_))),
                "token {token:?}"
            );
        }
    }
}
