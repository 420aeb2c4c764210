//! CORS Middleware Configuration

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use crate::config::{CorsSettings, Environment};

/// Methods the browser may use cross-origin.
pub const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create CORS layer from settings.
///
/// Origins outside the allow-list get no `Access-Control-Allow-Origin`, so the
/// browser blocks the response. Preflights are answered here and never reach
/// the router.
pub fn create_cors_layer(settings: &CorsSettings, environment: Environment) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins(environment)
        .into_iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(%environment, "No valid CORS origins configured; cross-origin requests will be blocked");
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(ALLOWED_METHODS.to_vec())
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::SET_COOKIE])
        .max_age(Duration::from_secs(settings.max_age_secs))
}
