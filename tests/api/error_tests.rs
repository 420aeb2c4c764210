//! Error boundary behaviour through the assembled pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, StatusCode},
};
use storefront_api::config::Environment;
use storefront_api::infrastructure::rate_limit::{
    RateLimitDecision, RateLimitError, RateLimitPolicy, RateLimitStore,
};
use storefront_api::presentation::middleware::RateLimiter;
use uuid::Uuid;

use crate::common::{body_json, request, test_settings, TestApp};

/// Counter store that blows up on every request.
struct ExplodingStore;

#[async_trait]
impl RateLimitStore for ExplodingStore {
    async fn hit(
        &self,
        _key: &str,
        _policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        panic!("counter shard poisoned")
    }

    async fn reset(&self, _key: &str) -> Result<(), RateLimitError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_handler_error_exposes_details_in_development() {
    let app = TestApp::new(Environment::Development).await;

    let response = app.get("/api/admin/reports").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Server error");
    assert_eq!(body["error"], "report generator crashed");
    assert!(body["correlation_id"]
        .as_str()
        .unwrap()
        .parse::<Uuid>()
        .is_ok());
}

#[tokio::test]
async fn test_handler_error_is_opaque_in_production() {
    let app = TestApp::new(Environment::Production).await;

    let response = app.get("/api/admin/reports").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    let body = body_json(response).await;
    assert_eq!(body["message"], "Server error");
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_panic_becomes_server_error() {
    let app = TestApp::new(Environment::Development).await;

    let response = app
        .send(request(Method::POST, "/api/returns").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Server error");
    assert_eq!(body["error"], "return label printer exploded");
}

#[tokio::test]
async fn test_server_keeps_serving_after_failure() {
    let app = TestApp::new(Environment::Production).await;

    app.send(request(Method::POST, "/api/returns").body(Body::empty()).unwrap())
        .await;
    let response = app.get("/api/test-server").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_slow_handler_times_out() {
    let app = TestApp::new(Environment::Development).await;

    let response = app.get("/api/addresses/slow").await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_method_not_allowed_is_not_a_server_error() {
    let app = TestApp::new(Environment::Development).await;

    let response = app
        .send(request(Method::DELETE, "/api/products").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_panicking_stage_reaches_boundary() {
    let limiter = RateLimiter::new(
        Arc::new(ExplodingStore),
        RateLimitPolicy::new(100, Duration::from_secs(900)),
        false,
    );
    let app = TestApp::with_rate_limiter(test_settings(Environment::Production), Some(limiter));

    let response = app.get("/api/test-server").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Server error");
    assert_eq!(body["error"], "Internal server error");
    assert!(body["correlation_id"].as_str().is_some());
}
