//! Router table assembly and dispatch.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use sqlx::postgres::PgPoolOptions;
use storefront_api::config::Environment;
use storefront_api::presentation::http::{mount_plan, GroupKind, RouteGroup, RouteTable};
use storefront_api::startup::{build_router, AppState};
use test_case::test_case;

use crate::common::{test_settings, TestApp};

fn state(environment: Environment) -> AppState {
    let settings = test_settings(environment);
    AppState {
        db: PgPoolOptions::new()
            .connect_lazy(&settings.database.url)
            .unwrap(),
        redis: None,
        settings: Arc::new(settings),
    }
}

async fn ok() -> &'static str {
    "ok"
}

#[tokio::test]
async fn test_empty_mount_plan_builds() {
    let router = build_router(
        state(Environment::Development),
        RouteTable::with_groups(mount_plan()),
        None,
    );
    assert!(router.is_ok());
}

#[tokio::test]
async fn test_production_requires_rate_limiter() {
    let err = build_router(
        state(Environment::Production),
        RouteTable::with_groups(mount_plan()),
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("rate limiter"));
}

#[tokio::test]
async fn test_overlapping_registration_fails_startup() {
    let table = RouteTable::new()
        .mount(RouteGroup::new(GroupKind::Order).route(Method::GET, "/history", ok))
        .mount(RouteGroup::new(GroupKind::Return).route(Method::GET, "/history", ok));

    let err = build_router(state(Environment::Development), table, None).unwrap_err();
    assert!(err.to_string().contains("GET /api/history"));
}

#[tokio::test]
async fn test_reserved_path_fails_startup() {
    let table = RouteTable::new()
        .mount(RouteGroup::new(GroupKind::Product).route(Method::GET, "/test-server", ok));

    let err = build_router(state(Environment::Development), table, None).unwrap_err();
    assert!(err.to_string().contains("reserved"));
}

#[tokio::test]
async fn test_shadowing_fails_startup() {
    let table = RouteTable::new()
        .mount(RouteGroup::new(GroupKind::User).route(Method::POST, "/auth/login", ok));

    let err = build_router(state(Environment::Development), table, None).unwrap_err();
    assert!(err.to_string().contains("/api/auth"));
}

#[test_case("/api/products", StatusCode::OK ; "product group")]
#[test_case("/api/profile", StatusCode::OK ; "user group")]
#[test_case("/api/addresses", StatusCode::NOT_FOUND ; "address prefix without route")]
#[test_case("/api/auth/login", StatusCode::NOT_FOUND ; "auth group has no routes")]
#[test_case("/products", StatusCode::NOT_FOUND ; "outside api")]
#[tokio::test]
async fn test_dispatch(uri: &str, expected: StatusCode) {
    let app = TestApp::new(Environment::Development).await;
    assert_eq!(app.get(uri).await.status(), expected);
}
