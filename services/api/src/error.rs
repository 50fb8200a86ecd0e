//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::jwt::TokenError;

/// Error taxonomy shared by the services and the HTTP layer
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input
    #[error("Bad request: {0}")]
    InvalidInput(String),

    /// Activity type outside the supported set
    #[error("Invalid activity type: {0}")]
    InvalidActivityType(String),

    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Bearer token failed verification
    #[error("Token rejected: {0}")]
    TokenRejected(#[from] TokenError),

    /// Unknown email or wrong password, deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The caller does not own the resource
    #[error("Forbidden")]
    Forbidden,

    /// Resource absent or deleted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation such as a duplicate email
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation ran out of time before the store answered
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Object storage rejected an upload
    #[error("Object storage error: {0}")]
    Storage(#[source] anyhow::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[source] DatabaseError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound => ApiError::NotFound("resource not found".to_string()),
            DatabaseError::UniqueViolation(_) => {
                ApiError::Conflict("resource already exists".to_string())
            }
            DatabaseError::Timeout => ApiError::DeadlineExceeded,
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InvalidActivityType(_) => {
                (StatusCode::BAD_REQUEST, "invalid activityType".to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::TokenRejected(TokenError::Expired) => (
                StatusCode::UNAUTHORIZED,
                "Expired request token".to_string(),
            ),
            ApiError::TokenRejected(TokenError::Invalid) => (
                StatusCode::UNAUTHORIZED,
                "Invalid request token".to_string(),
            ),
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::DeadlineExceeded => (
                StatusCode::GATEWAY_TIMEOUT,
                "Request timed out".to_string(),
            ),
            ApiError::Storage(e) => {
                error!(error = %e, "Object storage error");
                (StatusCode::BAD_GATEWAY, "Failed to upload file".to_string())
            }
            ApiError::Database(e) => {
                error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                error!(error = %e, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
