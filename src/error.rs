// HTTP API Error Types
use axum::{
    extract::rejection::JsonRejection,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::filter::FilterError;

const GENERIC_SERVER_ERROR: &str = "Server Error";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Message as raised, before production masking
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to the failure envelope.
    ///
    /// Internal errors only expose their message outside production.
    pub fn to_json(&self, production: bool) -> Value {
        let message = match self {
            ApiError::InternalServerError(_) if production => GENERIC_SERVER_ERROR,
            _ => self.message(),
        };
        let mut response = json!({
            "success": false,
            "error": message,
        });
        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }
        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => {
                tracing::debug!("Duplicate value for unique field '{}'", field);
                ApiError::bad_request("Duplicate field value entered")
            }
            StoreError::Validation(errors) => {
                let message = errors.message();
                ApiError::validation_error(message, Some(errors.fields))
            }
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::Sqlx(sqlx::Error::PoolTimedOut) | StoreError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Document store unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                tracing::error!("Document store error: {}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidValue { field, message } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field, message.clone());
                ApiError::validation_error(message, Some(field_errors))
            }
            other => ApiError::validation_error(other.to_string(), None),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) | AuthError::MissingToken => {
                ApiError::unauthorized(crate::auth::NOT_AUTHORIZED)
            }
            other => {
                tracing::error!("Authentication error: {}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(err.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

/// Unmasked message of an internal error, carried in the response extensions
/// so the router can render it for its own environment.
#[derive(Debug, Clone)]
pub struct InternalErrorMessage(pub String);

/// Re-render an internal error body for `production`; other responses pass through.
pub fn render_internal_error(mut response: Response, production: bool) -> Response {
    let Some(InternalErrorMessage(message)) = response.extensions_mut().remove::<InternalErrorMessage>() else {
        return response;
    };
    let body = ApiError::InternalServerError(message).to_json(production);
    (response.status(), Json(body)).into_response()
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("{} {}", status.as_u16(), self.message());
        }
        let mut response = (status, Json(self.to_json(crate::is_production!()))).into_response();
        if let ApiError::InternalServerError(message) = self {
            response.extensions_mut().insert(InternalErrorMessage(message));
        }
        response
    }
}
