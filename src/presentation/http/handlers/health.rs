//! Health Check Handlers
//!
//! # Endpoints
//! - `GET /api/test-server` - Diagnostic reachability check
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (can the server reach its store?)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::infrastructure::database;
use crate::startup::AppState;

pub const TEST_SERVER_MESSAGE: &str = "Server is working";

const STORE_SLOW_AFTER: Duration = Duration::from_millis(100);
const REDIS_SLOW_AFTER: Duration = Duration::from_millis(50);

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Detailed readiness response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub environment: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ServiceHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<ServiceHealth>,
}

/// Health status for individual services
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// `GET /api/test-server`
pub async fn test_server() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: TEST_SERVER_MESSAGE.to_string(),
    })
}

/// Liveness probe - checks if the server is running
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness probe - 200 while the store answers, 503 otherwise
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = probe("Document store", STORE_SLOW_AFTER, database::ping(&state.db)).await;
    let redis = match state.redis.clone() {
        Some(mut conn) => Some(
            probe("Redis", REDIS_SLOW_AFTER, async move {
                redis::cmd("PING")
                    .query_async::<String>(&mut conn)
                    .await
                    .map(|_| ())
            })
            .await,
        ),
        None => None,
    };

    let status = determine_overall_status(&database, redis.as_ref());
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };

    (
        code,
        Json(ReadinessResponse {
            status,
            environment: state.settings.environment.as_str(),
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: SERVER_START.elapsed().as_secs(),
            started_at: SERVER_START_TIME.to_rfc3339(),
            checks: HealthChecks { database, redis },
        }),
    )
}

/// Time one dependency check; answers slower than `slow_after` degrade.
async fn probe<E: fmt::Display>(
    name: &str,
    slow_after: Duration,
    check: impl Future<Output = Result<(), E>>,
) -> ServiceHealth {
    let start = Instant::now();
    match check.await {
        Ok(()) => {
            let elapsed = start.elapsed();
            ServiceHealth {
                status: if elapsed < slow_after {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(elapsed.as_millis() as u64),
                message: None,
            }
        }
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("{name} unreachable: {e}")),
        },
    }
}

/// The store is critical; Redis only degrades.
fn determine_overall_status(db: &ServiceHealth, redis: Option<&ServiceHealth>) -> HealthStatus {
    if db.status == HealthStatus::Unhealthy {
        return HealthStatus::Unhealthy;
    }

    let redis_impaired = redis.is_some_and(|r| r.status != HealthStatus::Healthy);
    if db.status == HealthStatus::Degraded || redis_impaired {
        return HealthStatus::Degraded;
    }

    HealthStatus::Healthy
}
