use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Handlers, the webhook processor and the scheduler sink all draw from the
/// same pool; webhook bursts after a call wave are the peak consumer.
const MAX_CONNECTIONS: u32 = 10;
/// Bounded acquisition: a pool exhausted by a burst surfaces as an error
/// instead of queueing requests indefinitely.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates the shared PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
