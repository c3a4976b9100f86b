//! Connection pool, embedded migrations and the readiness check.

use std::collections::HashSet;
use std::time::Duration;

use kompas_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::DbError;

// Relative to crates/kompas-db/Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing taken from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Never above `max_connections`.
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let max_connections = config.db_max_connections.max(1);
        Self {
            max_connections,
            min_connections: config.db_min_connections.min(max_connections),
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }
}

/// Open a Postgres pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    tracing::debug!(
        max = config.max_connections,
        min = config.min_connections,
        "connecting to postgres"
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;
    Ok(pool)
}

async fn applied_versions(pool: &PgPool) -> HashSet<i64> {
    // The bookkeeping table is absent until the first migration run.
    sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
        .map(|versions| versions.into_iter().collect())
        .unwrap_or_default()
}

/// Versions of the embedded migrations not yet applied, oldest first.
pub async fn pending_migrations(pool: &PgPool) -> Vec<i64> {
    let applied = applied_versions(pool).await;
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .map(|m| m.version)
        .collect()
}

/// Apply every pending migration and return how many ran.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails; earlier ones stay applied.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let pending = pending_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    if let Some(latest) = pending.last() {
        tracing::info!(count = pending.len(), latest, "applied migrations");
    }
    Ok(pending.len())
}

/// The pool answers and the facility table exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database cannot be reached, or
/// [`DbError::SchemaMissing`] if migrations have not been run.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    let has_schema: bool =
        sqlx::query_scalar("SELECT to_regclass('public.facilities') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if has_schema {
        Ok(())
    } else {
        Err(DbError::SchemaMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_migrations_are_ordered_up_migrations() {
        let versions: Vec<i64> = MIGRATOR
            .iter()
            .filter(|m| !m.migration_type.is_down_migration())
            .map(|m| m.version)
            .collect();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}
