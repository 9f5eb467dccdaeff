//! HTTP-facing error type for the service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by handlers and extractors
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid session. Tampered, expired and absent credentials all end up here.
    #[error("Unauthorized")]
    Unauthorized,

    /// Wrong email or password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                Some("Please sign in to continue".to_string()),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials",
                Some("Invalid email or password".to_string()),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg)),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            ),
        };

        let body = match message {
            Some(message) => json!({ "error": error, "message": message }),
            None => json!({ "error": error }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
