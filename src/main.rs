//! # Storefront API
//!
//! Application entry point. Initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Document store connection
//! - Middleware pipeline and router table
//! - HTTP server

use anyhow::Result;
use tracing::info;

use storefront_api::config::Settings;
use storefront_api::presentation::http::{mount_plan, RouteTable};
use storefront_api::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    storefront_api::telemetry::init_tracing();

    info!("Starting Storefront API...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings, RouteTable::with_groups(mount_plan())).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
