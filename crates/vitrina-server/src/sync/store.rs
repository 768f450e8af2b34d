//! Persistence seam for the product sync.
//!
//! The orchestrator and reconciliation writer only talk to [`SyncStore`], so
//! their control flow can be tested against an in-memory store.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vitrina_core::{CatalogRow, PRODUCTS_SYNC_TYPE};
use vitrina_db::DbError;

pub(crate) trait SyncStore {
    /// Timestamp of the last completed sync, if any.
    async fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>, DbError>;

    /// Claims the run lease. `None` means another run holds it.
    async fn claim_lease(&self, lease_secs: i64) -> Result<Option<Uuid>, DbError>;

    /// `false` means `lease` was lost to another run.
    async fn renew_lease(&self, lease: Uuid, lease_secs: i64) -> Result<bool, DbError>;

    /// `false` means `lease` was lost and nothing was recorded.
    async fn complete(&self, lease: Uuid, total_records: i32) -> Result<bool, DbError>;

    /// `false` means `lease` was lost and nothing was recorded.
    async fn fail(&self, lease: Uuid, error_message: &str) -> Result<bool, DbError>;

    async fn subcategory_names(&self) -> Result<Vec<String>, DbError>;

    async fn insert_rows(&self, rows: &[CatalogRow]) -> Result<u64, DbError>;

    /// Returns `(inserted, updated)`.
    async fn upsert_rows(&self, rows: &[CatalogRow]) -> Result<(u64, u64), DbError>;

    async fn delete_all_rows(&self) -> Result<u64, DbError>;

    async fn deactivate_missing(&self, seen_keys: &[String]) -> Result<u64, DbError>;
}

/// [`SyncStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub(crate) struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SyncStore for PgSyncStore {
    async fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let status = vitrina_db::get_sync_status(&self.pool, PRODUCTS_SYNC_TYPE).await?;
        Ok(status.and_then(|row| row.last_synced_at))
    }

    async fn claim_lease(&self, lease_secs: i64) -> Result<Option<Uuid>, DbError> {
        vitrina_db::claim_sync_lease(&self.pool, PRODUCTS_SYNC_TYPE, lease_secs).await
    }

    async fn renew_lease(&self, lease: Uuid, lease_secs: i64) -> Result<bool, DbError> {
        vitrina_db::renew_sync_lease(&self.pool, PRODUCTS_SYNC_TYPE, lease, lease_secs).await
    }

    async fn complete(&self, lease: Uuid, total_records: i32) -> Result<bool, DbError> {
        vitrina_db::complete_sync(&self.pool, PRODUCTS_SYNC_TYPE, lease, total_records).await
    }

    async fn fail(&self, lease: Uuid, error_message: &str) -> Result<bool, DbError> {
        vitrina_db::fail_sync(&self.pool, PRODUCTS_SYNC_TYPE, lease, error_message).await
    }

    async fn subcategory_names(&self) -> Result<Vec<String>, DbError> {
        Ok(vitrina_db::list_subcategory_names(&self.pool).await?)
    }

    async fn insert_rows(&self, rows: &[CatalogRow]) -> Result<u64, DbError> {
        Ok(vitrina_db::insert_catalog_rows(&self.pool, rows).await?)
    }

    async fn upsert_rows(&self, rows: &[CatalogRow]) -> Result<(u64, u64), DbError> {
        Ok(vitrina_db::upsert_catalog_rows(&self.pool, rows).await?)
    }

    async fn delete_all_rows(&self) -> Result<u64, DbError> {
        Ok(vitrina_db::delete_all_catalog_rows(&self.pool).await?)
    }

    async fn deactivate_missing(&self, seen_keys: &[String]) -> Result<u64, DbError> {
        Ok(vitrina_db::deactivate_missing_catalog_rows(&self.pool, seen_keys).await?)
    }
}
