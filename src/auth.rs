/// Authentication extractors
///
/// Staff endpoints take an HS256 bearer token whose `scope` claim must
/// include `staff`; the internal screening endpoint takes the shared key
/// configured for the listing service.
use crate::{context::AppContext, error::ModError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(String::from))
}

#[derive(Debug, Deserialize)]
struct StaffClaims {
    sub: String,
    #[serde(default)]
    scope: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Authenticated staff principal
#[derive(Debug, Clone)]
pub struct StaffAuthContext {
    pub staff_user_id: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for StaffAuthContext {
    type Rejection = ModError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ModError::Authentication("Missing authorization header".to_string()))?;

        let token_data = decode::<StaffClaims>(
            &token,
            &DecodingKey::from_secret(state.config.authentication.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| ModError::Jwt(e.to_string()))?;

        let claims = token_data.claims;
        if !claims.scope.split_whitespace().any(|s| s == "staff") {
            return Err(ModError::Authorization(
                "Staff scope required".to_string(),
            ));
        }

        Ok(StaffAuthContext {
            staff_user_id: claims.sub,
        })
    }
}

/// Trusted internal caller (the listing service)
#[derive(Debug, Clone)]
pub struct InternalAuthContext;

#[async_trait]
impl FromRequestParts<AppContext> for InternalAuthContext {
    type Rejection = ModError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ModError::Authentication("Missing authorization header".to_string()))?;

        if token != state.config.authentication.internal_api_key {
            return Err(ModError::Authentication(
                "Invalid internal API key".to_string(),
            ));
        }

        Ok(InternalAuthContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
