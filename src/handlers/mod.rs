// handlers/mod.rs - Route handlers grouped by resource
//
// Public reads need no credentials; every mutating route takes a `Principal`
// and applies the role gate and ownership checks from `auth::policy`.

pub mod auth;
pub mod bootcamps;
pub mod courses;

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::Document;
use crate::error::ApiError;
use crate::state::AppState;

/// Unwrap a JSON request body that must be an object.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Document, ApiError> {
    match payload? {
        Json(Value::Object(map)) => Ok(map),
        Json(_) => Err(ApiError::invalid_json("Request body must be a JSON object")),
    }
}

/// GET / - Liveness probe
pub async fn root() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// GET /health - Store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": state.store.backend()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
