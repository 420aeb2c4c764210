//! Dev proxy forwarding against a live upstream.

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use storefront_api::config::DevProxySettings;
use storefront_api::frontend::{proxy, DevProxy};
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::common::body_json;

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "host": headers.get(header::HOST).and_then(|h| h.to_str().ok()),
        "body": body,
    }))
}

async fn spawn_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().fallback(echo))
            .await
            .unwrap();
    });
    addr
}

fn settings(target: String) -> DevProxySettings {
    DevProxySettings {
        host: "127.0.0.1".into(),
        port: 0,
        target,
        path_prefix: "/api".into(),
        static_dir: None,
    }
}

fn proxy_router(target: String, static_dir: Option<&str>) -> Router {
    let proxy = DevProxy::new(&settings(target)).unwrap();
    proxy::router(proxy, static_dir)
}

async fn send(router: Router, request: Request<Body>) -> axum::response::Response {
    router.oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_prefix_is_stripped_and_query_kept() {
    let upstream = spawn_upstream().await;
    let router = proxy_router(format!("http://{upstream}"), None);

    let response = send(
        router,
        Request::builder()
            .uri("/api/widgets?color=red")
            .header(header::HOST, "localhost:5173")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["path"], "/widgets");
    assert_eq!(body["query"], "color=red");
    assert_eq!(body["host"], upstream.to_string());
}

#[tokio::test]
async fn test_bare_prefix_maps_to_root() {
    let upstream = spawn_upstream().await;
    let router = proxy_router(format!("http://{upstream}"), None);

    let response = send(router, Request::builder().uri("/api").body(Body::empty()).unwrap()).await;

    assert_eq!(body_json(response).await["path"], "/");
}

#[tokio::test]
async fn test_request_body_is_forwarded() {
    let upstream = spawn_upstream().await;
    let router = proxy_router(format!("http://{upstream}"), None);

    let response = send(
        router,
        Request::builder()
            .method(Method::POST)
            .uri("/api/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"sku":"MUG-03"}"#))
            .unwrap(),
    )
    .await;

    let body = body_json(response).await;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/orders");
    assert_eq!(body["body"], r#"{"sku":"MUG-03"}"#);
}

#[tokio::test]
async fn test_paths_outside_prefix_are_not_proxied() {
    let upstream = spawn_upstream().await;
    let router = proxy_router(format!("http://{upstream}"), None);

    let response = send(
        router,
        Request::builder().uri("/apiary").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir_serves_other_paths() {
    let dir = std::env::temp_dir().join(format!("dev-proxy-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>storefront</h1>").unwrap();

    let router = proxy_router("http://127.0.0.1:1".into(), dir.to_str());
    let response = send(
        router,
        Request::builder().uri("/index.html").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>storefront</h1>");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let router = proxy_router("http://127.0.0.1:1".into(), None);

    let response = send(
        router,
        Request::builder().uri("/api/widgets").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["message"], "Bad gateway");
}
