//! Postgres persistence for the Zureo catalog sync.
//!
//! Pool setup and migrations live here; table operations are split by table
//! and re-exported at the crate root.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use vitrina_core::AppConfig;

pub mod catalog;
pub mod overrides;
pub mod subcategories;
pub mod sync_status;

pub use catalog::{
    deactivate_missing_catalog_rows, delete_all_catalog_rows, get_catalog_item,
    insert_catalog_rows, list_catalog, upsert_catalog_rows, CatalogFilter, CatalogItemRow,
};
pub use overrides::{
    delete_catalog_override, get_catalog_override, upsert_catalog_override, CatalogOverrideRow,
    NewCatalogOverride,
};
pub use subcategories::{insert_subcategory, list_subcategory_names};
pub use sync_status::{
    claim_sync_lease, complete_sync, fail_sync, get_sync_status, renew_sync_lease, SyncStatusRow,
};

// Resolves to <workspace-root>/migrations/ from crates/vitrina-db/Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool sizing, taken from the `VITRINA_DB_*` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections.min(config.db_max_connections),
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply pending migrations and return how many were applied by this call.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    Ok(applied_migrations(pool).await.saturating_sub(before))
}

/// Zero when the bookkeeping table does not exist yet.
async fn applied_migrations(pool: &PgPool) -> usize {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

/// Round-trip a trivial query to prove the pool can reach Postgres.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can run the query.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
