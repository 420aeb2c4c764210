//! Application Startup
//!
//! Application building and server initialization. Startup is all-or-nothing:
//! the store connection, rate-limit backend, router table and middleware
//! pipeline are fully assembled before the listener is bound.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::{RateLimitStoreKind, Settings};
use crate::infrastructure::database;
use crate::infrastructure::rate_limit::{MemoryStore, RateLimitStore, RedisStore};
use crate::presentation::http::{handlers::health, routes, RouteTable};
use crate::presentation::middleware::{Pipeline, RateLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings and the route groups to mount.
    pub async fn build(settings: Settings, table: RouteTable) -> Result<Self> {
        health::init_server_start();

        let db = database::connect(&settings.database)
            .await
            .context("document store is unreachable")?;

        let redis = match settings.redis.url.as_deref() {
            Some(url) => Some(connect_redis(url, &settings).await?),
            None => None,
        };

        let rate_limiter = create_rate_limiter(&settings, redis.as_ref())?;

        let state = AppState {
            db,
            redis,
            settings: Arc::new(settings.clone()),
        };
        let router = build_router(state, table, rate_limiter)?;

        let addr = settings.server.socket_addr().with_context(|| {
            format!("invalid listen address {}", settings.server_addr())
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!(
            address = %listener.local_addr()?,
            environment = %settings.environment,
            "Listening"
        );

        Ok(Self { listener, router })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Assemble the router table behind the middleware pipeline.
pub fn build_router(
    state: AppState,
    table: RouteTable,
    rate_limiter: Option<RateLimiter>,
) -> Result<Router> {
    let settings = state.settings.as_ref().clone();
    let router = routes::create_router(state, table)?;

    let pipeline = Pipeline::new(settings, rate_limiter);
    let stages: Vec<_> = pipeline.stages().iter().map(|s| s.name()).collect();
    tracing::info!(stages = ?stages, "Middleware pipeline assembled");

    Ok(pipeline.apply(router)?)
}

/// The limiter for production; development runs unlimited.
fn create_rate_limiter(
    settings: &Settings,
    redis: Option<&ConnectionManager>,
) -> Result<Option<RateLimiter>> {
    if !settings.environment.is_production() {
        return Ok(None);
    }

    let config = &settings.rate_limit;
    let store: Arc<dyn RateLimitStore> = match config.store {
        RateLimitStoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            store.clone().spawn_sweeper(
                Duration::from_secs(config.window_secs),
                Duration::from_secs(config.sweep_interval_secs),
            );
            store
        }
        RateLimitStoreKind::Redis => {
            let conn = redis
                .cloned()
                .ok_or_else(|| anyhow!("rate limit store 'redis' requires REDIS_URL"))?;
            Arc::new(RedisStore::new(conn))
        }
    };

    tracing::info!(
        store = ?config.store,
        max_requests = config.max_requests,
        window_secs = config.window_secs,
        "Rate limiter configured"
    );
    Ok(Some(RateLimiter::from_settings(store, config)))
}

/// Redis is optional unless it backs the rate limiter.
async fn connect_redis(url: &str, settings: &Settings) -> Result<ConnectionManager> {
    let client = redis::Client::open(url).context("invalid REDIS_URL")?;
    let conn = ConnectionManager::new(client)
        .await
        .context("Redis is unreachable")?;
    tracing::info!(
        rate_limit_store = ?settings.rate_limit.store,
        "Redis connection established"
    );
    Ok(conn)
}

/// Resolves on Ctrl+C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
