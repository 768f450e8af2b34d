//! Database operations for `sync_status`: one row per sync type, doubling as
//! the run-level lease.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use vitrina_core::SyncStatusKind;

use crate::DbError;

/// A row from the `sync_status` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SyncStatusRow {
    pub sync_type: String,
    pub status: String,
    /// Time of the last COMPLETED run.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub total_records: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SyncStatusRow {
    #[must_use]
    pub fn kind(&self) -> Option<SyncStatusKind> {
        SyncStatusKind::parse(&self.status)
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_status(
    pool: &PgPool,
    sync_type: &str,
) -> Result<Option<SyncStatusRow>, DbError> {
    let row = sqlx::query_as::<_, SyncStatusRow>(
        "SELECT sync_type, status, last_synced_at, total_records, started_at, \
                lease_expires_at, error_message, updated_at \
         FROM sync_status \
         WHERE sync_type = $1",
    )
    .bind(sync_type)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Atomically claim the `in_progress` lease for `sync_type`.
///
/// Succeeds when no row exists, the previous run finished, or the previous
/// lease has expired. Returns the new lease id, or `None` when another run
/// holds a live lease. The id must be passed to [`renew_sync_lease`],
/// [`complete_sync`] and [`fail_sync`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn claim_sync_lease(
    pool: &PgPool,
    sync_type: &str,
    lease_secs: i64,
) -> Result<Option<Uuid>, DbError> {
    let claimed = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO sync_status \
             (sync_type, status, started_at, lease_id, lease_expires_at, updated_at) \
         VALUES ($1, 'in_progress', NOW(), $3, \
                 NOW() + ($2::bigint * INTERVAL '1 second'), NOW()) \
         ON CONFLICT (sync_type) DO UPDATE SET \
             status           = 'in_progress', \
             started_at       = NOW(), \
             lease_id         = EXCLUDED.lease_id, \
             lease_expires_at = EXCLUDED.lease_expires_at, \
             error_message    = NULL, \
             updated_at       = NOW() \
         WHERE sync_status.status <> 'in_progress' \
            OR sync_status.lease_expires_at IS NULL \
            OR sync_status.lease_expires_at < NOW() \
         RETURNING lease_id",
    )
    .bind(sync_type)
    .bind(lease_secs)
    .bind(Uuid::new_v4())
    .fetch_optional(pool)
    .await?;

    Ok(claimed)
}

/// Push the lease expiry `lease_secs` into the future.
///
/// Returns `false` when `lease_id` no longer holds the lease, i.e. it expired
/// and another run claimed it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn renew_sync_lease(
    pool: &PgPool,
    sync_type: &str,
    lease_id: Uuid,
    lease_secs: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE sync_status SET \
             lease_expires_at = NOW() + ($3::bigint * INTERVAL '1 second'), \
             updated_at       = NOW() \
         WHERE sync_type = $1 AND lease_id = $2 AND status = 'in_progress'",
    )
    .bind(sync_type)
    .bind(lease_id)
    .bind(lease_secs)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a completed run and release the lease.
///
/// Returns `false`, leaving the row untouched, when `lease_id` no longer
/// holds the lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn complete_sync(
    pool: &PgPool,
    sync_type: &str,
    lease_id: Uuid,
    total_records: i32,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE sync_status SET \
             status           = 'completed', \
             last_synced_at   = NOW(), \
             total_records    = $3, \
             lease_id         = NULL, \
             lease_expires_at = NULL, \
             error_message    = NULL, \
             updated_at       = NOW() \
         WHERE sync_type = $1 AND lease_id = $2 AND status = 'in_progress'",
    )
    .bind(sync_type)
    .bind(lease_id)
    .bind(total_records)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a failed run and release the lease. The last completed timestamp
/// and record count are left as they were.
///
/// Returns `false`, leaving the row untouched, when `lease_id` no longer
/// holds the lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fail_sync(
    pool: &PgPool,
    sync_type: &str,
    lease_id: Uuid,
    error_message: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE sync_status SET \
             status           = 'failed', \
             error_message    = $3, \
             lease_id         = NULL, \
             lease_expires_at = NULL, \
             updated_at       = NOW() \
         WHERE sync_type = $1 AND lease_id = $2 AND status = 'in_progress'",
    )
    .bind(sync_type)
    .bind(lease_id)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
