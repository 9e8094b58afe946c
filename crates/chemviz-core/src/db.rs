use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::config::PoolConfig;

pub type DbPool = Pool<Postgres>;

pub fn pool_options(settings: &PoolConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
}

/// Opens the history store pool sized by `settings`.
pub async fn connect(database_url: &str, settings: &PoolConfig) -> Result<DbPool> {
    let pool = pool_options(settings)
        .connect(database_url)
        .await
        .context("failed to connect to the history database")?;
    info!(
        max_connections = settings.max_connections,
        acquire_timeout_secs = settings.acquire_timeout_secs,
        "history database pool ready"
    );
    Ok(pool)
}

/// Applies the `upload_history` migrations bundled with this crate.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to migrate the upload_history schema")
}
