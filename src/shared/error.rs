//! Application Error Types
//!
//! Centralized error handling with Axum integration.
//!
//! Client errors render directly as `{"message": ...}`. Server-side failures
//! render as a bare 500 tagged with an [`UnhandledFailure`] extension; the
//! error boundary turns that into the public error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Error response body for handled (client) errors
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Failure detail carried on a 500 response until the error boundary
/// replaces the body.
#[derive(Debug, Clone)]
pub struct UnhandledFailure {
    pub message: String,
}

impl UnhandledFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Bare 500 response carrying this failure.
    pub fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) | AppError::Database(_) | AppError::Redis(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => msg,
            AppError::PayloadTooLarge { limit } => {
                format!("Request body exceeds the {} byte limit", limit)
            }
            AppError::Internal(msg) => return UnhandledFailure::new(msg).into_response(),
            AppError::Database(e) => {
                return UnhandledFailure::new(format!("Database error: {}", e)).into_response()
            }
            AppError::Redis(e) => {
                return UnhandledFailure::new(format!("Redis error: {}", e)).into_response()
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
