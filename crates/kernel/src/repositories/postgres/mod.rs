//! Postgres repositories for the plugin registry and plugin storage.
//!
//! Runs against the schema in `migrations/`. Numeric IDs are stored as
//! `BIGINT` by bit pattern: a `u64` round-trips through `as i64` unchanged,
//! which keeps FNV-derived IDs above `i64::MAX` intact.

mod plugin_storage;
mod plugins;

pub use plugin_storage::PostgresPluginStorageRepository;
pub use plugins::PostgresPluginRepository;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect a pool sized for the panel's background workloads.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run migrations")?;

    Ok(())
}

pub(crate) fn id_to_db(id: u64) -> i64 {
    id as i64
}

pub(crate) fn id_from_db(id: i64) -> u64 {
    id as u64
}
