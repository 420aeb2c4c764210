//! Error Boundary
//!
//! Outermost stage. Any response tagged with [`UnhandledFailure`] (returned
//! by a handler or stage, or produced from a caught panic) is logged in full
//! and replaced by the uniform public error body:
//!
//! ```json
//! {"message": "Server error", "error": "...", "correlation_id": "..."}
//! ```
//!
//! `error` carries the internal message only when details are exposed;
//! otherwise a generic text. The correlation id ties the response to the log
//! line.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use uuid::Uuid;

use crate::shared::error::UnhandledFailure;

pub const SERVER_ERROR_MESSAGE: &str = "Server error";
pub const GENERIC_ERROR_TEXT: &str = "Internal server error";

/// Public body of a 500 response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerErrorBody {
    pub message: String,
    pub error: String,
    pub correlation_id: Uuid,
}

/// Whether the internal failure message is echoed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorExposure {
    Detailed,
    Opaque,
}

impl ErrorExposure {
    pub fn from_flag(expose_details: bool) -> Self {
        if expose_details {
            ErrorExposure::Detailed
        } else {
            ErrorExposure::Opaque
        }
    }
}

/// Error boundary middleware.
pub async fn error_boundary(
    State(exposure): State<ErrorExposure>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let mut response = next.run(request).await;
    let Some(failure) = response.extensions_mut().remove::<UnhandledFailure>() else {
        return response;
    };

    let correlation_id = Uuid::new_v4();
    tracing::error!(
        %correlation_id,
        %method,
        %path,
        error = %failure.message,
        "Server error"
    );

    let body = ServerErrorBody {
        message: SERVER_ERROR_MESSAGE.to_string(),
        error: match exposure {
            ErrorExposure::Detailed => failure.message,
            ErrorExposure::Opaque => GENERIC_ERROR_TEXT.to_string(),
        },
        correlation_id,
    };

    // Keep headers set by inner stages (CORS, security), drop the ones that
    // described the discarded body.
    let (parts, _) = response.into_parts();
    let mut replacement = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE
            && name != header::CONTENT_LENGTH
            && name != header::CONTENT_ENCODING
        {
            replacement.headers_mut().append(name.clone(), value.clone());
        }
    }
    replacement
}

/// Turn a panic payload into a tagged 500 for the boundary.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };

    UnhandledFailure::new(message).into_response()
}

pub type PanicLayer = CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response>;

/// Layer converting handler panics into failures seen by the boundary.
pub fn create_panic_layer() -> PanicLayer {
    CatchPanicLayer::custom(panic_response as fn(Box<dyn Any + Send + 'static>) -> Response)
}
