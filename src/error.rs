use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db::pool::StoreError;
use crate::db::scope::ScopeError;
use crate::validate::FieldErrors;

/// Request-level error surfaced to HTTP callers.
///
/// The status set is deliberately small. Cross-tenant access and plain
/// missing rows both come back as the same 404 so a caller can never probe
/// whether a record exists in someone else's tenant. Store and programming
/// failures are logged in full server-side and reach the caller as a
/// generic 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// A mandatory identifier was absent. Always raised before any data
    /// access, and always names the missing field.
    pub fn missing_param(field: &str) -> Self {
        ApiError::BadRequest(format!("{} is required", field))
    }

    /// Not-found and not-permitted, conflated on purpose.
    pub fn not_found() -> Self {
        ApiError::NotFound("not found or not permitted".to_string())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal() -> Self {
        ApiError::Internal("internal server error".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Validation { message, details } => {
                json!({ "error": message, "details": details })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation {
            message: "validation failed".to_string(),
            details: errors.to_json(),
        }
    }
}

impl From<ScopeError> for ApiError {
    fn from(err: ScopeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Filter(e) => ApiError::BadRequest(e.to_string()),
            StoreError::IdentifierRequired => {
                // A unique lookup without a primary key is a bug in the
                // caller, not caller input
                tracing::error!("unique lookup issued without an identifier");
                ApiError::internal()
            }
            StoreError::InvalidUrl => {
                tracing::error!("store configuration error: invalid database URL");
                ApiError::internal()
            }
            StoreError::Sqlx(e) => {
                tracing::error!("store error: {}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("store error: {}", err);
        ApiError::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
