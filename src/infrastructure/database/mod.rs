//! Database Module
//!
//! Process-wide connection pool to the document store. Route groups keep
//! their documents in JSONB columns; this module only owns the connection
//! lifecycle.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::config::DatabaseSettings;

/// Upper bound for the delay between two connection attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("could not connect to the database after {attempts} attempt(s): {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

/// Connect to the configured store.
///
/// Makes `connect_attempts` attempts (one by default). The caller treats an
/// error as fatal: the process must not serve traffic without its store.
#[instrument(skip(settings), fields(attempts = settings.connect_attempts))]
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DatabaseError> {
    let attempts = settings.connect_attempts.max(1);
    let mut attempt = 1;

    loop {
        match create_pool(settings).await {
            Ok(pool) => {
                info!(attempt, "Database connection established");
                return Ok(pool);
            }
            Err(source) if attempt >= attempts => {
                return Err(DatabaseError::Unavailable {
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                let delay = retry_delay(settings.retry_base_delay_ms, attempt);
                warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Database connection failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Create a PostgreSQL connection pool
async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

/// Round-trip a trivial query.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Exponential backoff: `base * 2^(attempt - 1)`, capped.
fn retry_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_RETRY_DELAY)
}
