// handlers/auth.rs - /api/v1/auth

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::json_body;
use crate::auth::{hash_password, issue_token, verify_password, Principal};
use crate::database::models::user::PASSWORD_FIELD;
use crate::database::models::USERS;
use crate::database::schema::{Document, FieldKind, ID_FIELD};
use crate::database::StoreError;
use crate::error::ApiError;
use crate::filter::{Condition, Filter};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::Role;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// POST /api/v1/auth/register - Create a user and return a token
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let body = json_body(payload)?;
    if body.get("role").and_then(Value::as_str) == Some(Role::Admin.as_str()) {
        return Err(ApiError::validation_error("'admin' is not a valid value for role", None));
    }

    let mut user = USERS.prepare_create(&body).map_err(StoreError::Validation)?;
    if let Some(Value::String(password)) = user.get(PASSWORD_FIELD) {
        let hashed = hash_password(password)?;
        user.insert(PASSWORD_FIELD.to_string(), Value::String(hashed));
    }
    let user = state.repository(&USERS).insert_prepared(user, Map::new()).await?;

    let token = token_for(&state, &user)?;
    info!(user = ?user.get(ID_FIELD), "Registered user");
    Ok(ApiResponse::created(json!({ "token": token })))
}

/// POST /api/v1/auth/login - Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let body = json_body(payload)?;
    let email = body.get("email").and_then(Value::as_str).filter(|s| !s.is_empty());
    let password = body.get("password").and_then(Value::as_str).filter(|s| !s.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let filter = Filter::new().with(Condition::eq("email", FieldKind::String, json!(email)));
    let Some(mut user) = state.repository(&USERS).select_with_hidden(filter).await? else {
        warn!("Login attempt for unknown email");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    let stored_hash = user.get(PASSWORD_FIELD).and_then(Value::as_str).unwrap_or_default();
    if !verify_password(password, stored_hash) {
        warn!(user = ?user.get(ID_FIELD), "Login attempt with wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }
    USERS.strip_hidden(&mut user);

    let token = token_for(&state, &user)?;
    Ok(ApiResponse::success(json!({ "token": token })))
}

/// GET /api/v1/auth/me - The authenticated user
pub async fn me(State(state): State<AppState>, principal: Principal) -> ApiResult<Document> {
    let user = state.repository(&USERS).select_404(&principal.id).await?;
    Ok(ApiResponse::success(user))
}

fn token_for(state: &AppState, user: &Document) -> Result<String, ApiError> {
    let id = user
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::internal_server_error("stored user has no id"))?;
    let role = user
        .get("role")
        .and_then(Value::as_str)
        .and_then(|r| r.parse().ok())
        .unwrap_or(Role::User);
    Ok(issue_token(id, role, &state.config.security)?)
}
