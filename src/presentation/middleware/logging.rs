//! Request Logging
//!
//! Records method and path once for every request that reaches this stage.
//! Requests already answered by CORS preflight or the rate limiter are not
//! seen here; the rate limiter logs its own rejections.

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, OnRequest, TraceLayer};
use tracing::{Level, Span};

/// Event message emitted for each logged request.
pub const REQUEST_LOG_MESSAGE: &str = "Incoming request";

/// `OnRequest` hook emitting one INFO event per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequest;

impl<B> OnRequest<B> for LogRequest {
    fn on_request(&mut self, request: &Request<B>, _span: &Span) {
        tracing::info!(
            method = %request.method(),
            path = %request.uri().path(),
            "{}",
            REQUEST_LOG_MESSAGE
        );
    }
}

pub type RequestLogLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, DefaultMakeSpan, LogRequest, DefaultOnResponse>;

/// Create the request logging layer.
pub fn create_trace_layer() -> RequestLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(LogRequest)
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
}
