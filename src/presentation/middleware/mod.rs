//! Middleware
//!
//! Tower middleware for request admission. [`pipeline`] assembles the stages
//! in their fixed order.

pub mod body;
pub mod cookies;
pub mod cors;
pub mod error_boundary;
pub mod logging;
pub mod pipeline;
pub mod rate_limit;
pub mod security;

pub use body::{parse_body, ParsedBody};
pub use cookies::{parse_cookies, RequestCookies};
pub use cors::create_cors_layer;
pub use error_boundary::{
    create_panic_layer,
    error_boundary,
    ErrorExposure,
    ServerErrorBody,
    SERVER_ERROR_MESSAGE,
};
pub use logging::{create_trace_layer, REQUEST_LOG_MESSAGE};
pub use pipeline::{Pipeline, PipelineError, Stage};
pub use rate_limit::{rate_limit, RateLimiter, RATE_LIMIT_MESSAGE};
pub use security::{
    create_security_headers_layer,
    SecurityHeadersConfig,
    SecurityHeadersLayer,
};
