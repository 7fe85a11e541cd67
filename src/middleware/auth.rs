use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde_json::Value;
use tracing::debug;

use crate::auth::{validate_jwt, AuthError, Principal};
use crate::database::models::USERS;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the caller from `Authorization: Bearer <jwt>`.
///
/// The token must verify and name an existing user; the stored role wins
/// over the role in the token.
#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers)?;
        let claims = validate_jwt(token, &state.config.security).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            AuthError::InvalidToken(e.to_string())
        })?;

        let user = state
            .repository(&USERS)
            .select_one(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken("user no longer exists".to_string()))?;

        let role = user
            .get("role")
            .and_then(Value::as_str)
            .and_then(|r| r.parse().ok())
            .unwrap_or(claims.role);

        Ok(Principal { id: claims.sub, role })
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_str = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MissingToken),
    }
}
