//! Wire shapes of the energy API and token endpoint
//!
//! Nested fields are optional: the provider's schema is loosely documented
//! and a missing field must surface as a data error, not a decode panic.

use greenwindow_domain::{ForecastEntry, GreenWindowError};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductGroupsResponse {
    #[serde(default)]
    pub product_groups: Option<Vec<ProductGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductGroup {
    #[serde(default)]
    pub resources: Option<Vec<Resource>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl ProductGroupsResponse {
    /// `productGroups[0].resources[0].organizationId`.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Data` naming the first missing level.
    pub fn first_organization_id(&self) -> Result<String, GreenWindowError> {
        let group = self
            .product_groups
            .as_deref()
            .and_then(<[ProductGroup]>::first)
            .ok_or_else(|| missing("productGroups[0]"))?;
        let resource = group
            .resources
            .as_deref()
            .and_then(<[Resource]>::first)
            .ok_or_else(|| missing("productGroups[0].resources[0]"))?;
        resource
            .organization_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("productGroups[0].resources[0].organizationId"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub data: Vec<ForecastEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

fn missing(path: &str) -> GreenWindowError {
    GreenWindowError::Data(format!("Could not extract organizationId: {path} is missing"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ProductGroupsResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn extracts_first_organization() {
        let response = parse(
            r#"{"productGroups":[{"resources":[{"organizationId":"org-1"},{"organizationId":"org-2"}]},{"resources":[{"organizationId":"org-3"}]}]}"#,
        );
        assert_eq!(response.first_organization_id().unwrap(), "org-1");
    }

    #[test]
    fn each_missing_level_is_data_error() {
        for body in [
            r"{}",
            r#"{"productGroups":[]}"#,
            r#"{"productGroups":[{}]}"#,
            r#"{"productGroups":[{"resources":[]}]}"#,
            r#"{"productGroups":[{"resources":[{}]}]}"#,
        ] {
            assert!(
                matches!(parse(body).first_organization_id(), Err(GreenWindowError::Data(_))),
                "body {body}"
            );
        }
    }

    #[test]
    fn token_response_tolerates_missing_optionals() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(token.refresh_token.is_none());
        assert!(token.expires_in.is_none());
    }
}
