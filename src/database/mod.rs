pub mod identities;
pub mod models;
pub mod profiles;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Lookup timed out after {0}ms")]
    Timeout(u64),

    #[error("Unexpected row shape: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Build the application pool from DATABASE_URL.
///
/// The pool connects lazily: the process must come up while the database is
/// down so the allowlist fallback stays reachable.
pub fn connect_pool() -> Result<PgPool, DatabaseError> {
    let raw = std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
    let db_url = url::Url::parse(&raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

    let config = &crate::config::config().database;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy(db_url.as_str())?;

    Ok(pool)
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
