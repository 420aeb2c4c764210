//! Built-in endpoint tests.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use storefront_api::config::Environment;

use crate::common::{body_json, TestApp};

#[tokio::test]
async fn test_server_endpoint_in_development() {
    let app = TestApp::new(Environment::Development).await;
    let server = TestServer::new(app.router).unwrap();

    let response = server.get("/api/test-server").await;

    response.assert_status_ok();
    response.assert_json(&json!({"message": "Server is working"}));
}

#[tokio::test]
async fn test_server_endpoint_in_production() {
    let app = TestApp::new(Environment::Production).await;

    let response = app.get("/api/test-server").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"message": "Server is working"}));
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new(Environment::Development).await;
    let server = TestServer::new(app.router).unwrap();

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    response.assert_json(&json!({"status": "alive"}));
}

#[tokio::test]
async fn test_readiness_reports_unreachable_store() {
    let app = TestApp::new(Environment::Development).await;

    let response = app.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["checks"]["database"]["status"], "unhealthy");
    assert!(body["checks"].get("redis").is_none());
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::new(Environment::Development).await;

    let response = app.get("/api/no-such-thing").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"message": "Not found"}));
}
