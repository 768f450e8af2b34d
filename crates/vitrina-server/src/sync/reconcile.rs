//! Writes flattened catalog rows to the store.

use std::collections::HashMap;

use vitrina_core::{CatalogRow, SyncStrategy};

use super::store::SyncStore;
use super::SyncError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReconcileOutcome {
    /// Rows that did not exist before this run.
    pub inserted: u64,
    /// Existing rows refreshed in place (upsert only).
    pub updated: u64,
    /// Rows lost to failed batches.
    pub errors: usize,
    pub failed_batches: usize,
    /// Rows soft-deleted because they were absent from this run.
    pub stale: u64,
}

impl ReconcileOutcome {
    pub(crate) fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Collapses rows sharing a `sync_key`. The last occurrence wins and keeps
/// the position of the first.
pub(crate) fn dedupe_by_sync_key(rows: Vec<CatalogRow>) -> Vec<CatalogRow> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut unique: Vec<CatalogRow> = Vec::with_capacity(rows.len());

    for row in rows {
        if let Some(&index) = positions.get(&row.sync_key) {
            tracing::warn!(
                sync_key = %row.sync_key,
                "duplicate sync key in zureo data; keeping last"
            );
            unique[index] = row;
        } else {
            positions.insert(row.sync_key.clone(), unique.len());
            unique.push(row);
        }
    }

    unique
}

/// Writes `rows` using `strategy`, one batch of `batch_size` at a time.
///
/// A failing batch is logged and counted; the remaining batches still run.
/// Under [`SyncStrategy::Upsert`], rows not seen in this run are deactivated
/// afterwards, unless any batch failed.
///
/// # Errors
///
/// Returns [`SyncError::Database`] if the full-replace delete or the stale
/// deactivation fails. Batch failures are not errors.
pub(crate) async fn reconcile<S: SyncStore>(
    store: &S,
    rows: Vec<CatalogRow>,
    strategy: SyncStrategy,
    batch_size: usize,
) -> Result<ReconcileOutcome, SyncError> {
    let rows = dedupe_by_sync_key(rows);
    let batch_size = batch_size.max(1);
    let mut outcome = ReconcileOutcome::default();

    if strategy == SyncStrategy::FullReplace {
        let deleted = store.delete_all_rows().await?;
        tracing::info!(deleted, "full replace: cleared catalog");
    }

    for (index, batch) in rows.chunks(batch_size).enumerate() {
        let result = match strategy {
            SyncStrategy::FullReplace => store.insert_rows(batch).await.map(|n| (n, 0)),
            SyncStrategy::Upsert => store.upsert_rows(batch).await,
        };

        match result {
            Ok((inserted, updated)) => {
                outcome.inserted += inserted;
                outcome.updated += updated;
            }
            Err(e) => {
                tracing::error!(
                    batch = index,
                    rows = batch.len(),
                    error = %e,
                    "catalog batch write failed"
                );
                outcome.errors += batch.len();
                outcome.failed_batches += 1;
            }
        }
    }

    if strategy == SyncStrategy::Upsert {
        if outcome.failed_batches == 0 {
            let seen: Vec<String> = rows.iter().map(|r| r.sync_key.clone()).collect();
            outcome.stale = store.deactivate_missing(&seen).await?;
        } else {
            tracing::warn!(
                failed_batches = outcome.failed_batches,
                "skipping stale deactivation after partial write"
            );
        }
    }

    tracing::info!(
        strategy = %strategy,
        inserted = outcome.inserted,
        updated = outcome.updated,
        errors = outcome.errors,
        failed_batches = outcome.failed_batches,
        stale = outcome.stale,
        "catalog reconciled"
    );

    Ok(outcome)
}
