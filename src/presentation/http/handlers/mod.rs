//! HTTP Handlers
//!
//! Built-in endpoints. Business handlers belong to the route groups.

pub mod health;

use axum::{http::StatusCode, Json};

use crate::shared::error::ErrorResponse;

pub const NOT_FOUND_MESSAGE: &str = "Not found";

/// Fallback for paths no route claims.
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: NOT_FOUND_MESSAGE.to_string(),
        }),
    )
}
