//! Rate limiting through the assembled production pipeline.

use axum::{
    body::Body,
    http::{header, Method, StatusCode},
};
use serde_json::json;
use storefront_api::config::Environment;

use crate::common::{body_json, capture_logs, request_from, TestApp};

const CLIENT: [u8; 4] = [198, 51, 100, 20];

async fn get_from(app: &TestApp, ip: [u8; 4]) -> axum::response::Response {
    app.send(
        request_from(Method::GET, "/api/test-server", ip)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_hundred_and_first_request_is_rejected() {
    let app = TestApp::new(Environment::Production).await;

    for n in 1..=100u32 {
        let response = get_from(&app, CLIENT).await;
        assert_eq!(response.status(), StatusCode::OK, "request {n}");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (100 - n).to_string().as_str()
        );
    }

    let response = get_from(&app, CLIENT).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-limit"], "100");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    // Security headers sit outside the limiter.
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");

    let body = body_json(response).await;
    assert_eq!(body["message"], "Too many requests, please try again later.");
    assert!(body["retry_after"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_rejected_requests_are_not_logged() {
    let (logs, _guard) = capture_logs();
    let app = TestApp::new(Environment::Production).await;

    for _ in 0..105 {
        get_from(&app, CLIENT).await;
    }

    assert_eq!(logs.count("Incoming request"), 100);
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let app = TestApp::new(Environment::Production).await;

    for _ in 0..100 {
        get_from(&app, CLIENT).await;
    }
    assert_eq!(
        get_from(&app, CLIENT).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    let other = get_from(&app, [198, 51, 100, 21]).await;
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(
        body_json(other).await,
        json!({"message": "Server is working"})
    );
}

#[tokio::test]
async fn test_development_is_unlimited() {
    let app = TestApp::new(Environment::Development).await;

    for _ in 0..150 {
        let response = get_from(&app, CLIENT).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn test_forwarded_for_ignored_without_trust_proxy() {
    let app = TestApp::new(Environment::Production).await;

    for n in 0..101u32 {
        let response = app
            .send(
                request_from(Method::GET, "/api/test-server", CLIENT)
                    .header("x-forwarded-for", format!("10.0.0.{n}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        let expected = if n < 100 {
            StatusCode::OK
        } else {
            StatusCode::TOO_MANY_REQUESTS
        };
        assert_eq!(response.status(), expected);
    }
}
