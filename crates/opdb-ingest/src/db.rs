//! Database handle
//!
//! A loader run owns exactly one connection: batches, copies and extraction
//! passes are issued strictly one after another, so a single-connection pool
//! gives every component a cheap clonable handle without ever running two
//! statements concurrently.

use crate::config::DatabaseConfig;
use crate::error::{IngestError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Shared handle to the single loader connection
pub type DatabaseHandle = PgPool;

/// Connect and verify the server answers before any work starts.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseHandle> {
    let options = config.target.connect_options()?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(options)
        .await
        .map_err(IngestError::Connection)?;

    health_check(&pool).await?;

    tracing::info!(target_db = ?config.target, "Connected to PostgreSQL");

    Ok(pool)
}

pub async fn health_check(db: &DatabaseHandle) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(db)
        .await
        .map(|_| ())
        .map_err(IngestError::Connection)
}

/// Release the connection. Safe to call once every stage has returned.
pub async fn close(db: DatabaseHandle) {
    db.close().await;
    tracing::info!("Database connection closed");
}

/// `SELECT COUNT(*)` on a catalog table.
pub async fn count_rows(db: &DatabaseHandle, table: &str) -> std::result::Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {}", opdb_common::sql::quote_ident(table));
    sqlx::query_scalar(&sql).fetch_one(db).await
}
