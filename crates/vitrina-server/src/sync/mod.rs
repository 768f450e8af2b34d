//! Product sync orchestration: Zureo fetch, flatten, reconcile, status.
//!
//! One run is: freshness check, lease claim, full catalog fetch, subcategory
//! mapping, flattening, reconciliation and a final status write. Any error
//! after the lease is claimed marks the run `failed` before it propagates.
//! The lease is renewed on a heartbeat while the run is in flight, and only
//! its holder may record the outcome.

mod reconcile;
mod store;

use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use vitrina_core::{AppConfig, CatalogRow, ConfigError, SynonymTable, SyncStrategy};
use vitrina_db::DbError;
use vitrina_zureo::{flatten_product, CategoryMapper, FlattenContext, ZureoClient, ZureoError};

use crate::api::AppState;

use reconcile::{dedupe_by_sync_key, reconcile};
pub(crate) use store::{PgSyncStore, SyncStore};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync is not configured: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Zureo(#[from] ZureoError),

    #[error("a product sync is already running")]
    AlreadyRunning,

    #[error("the sync lease expired and was claimed by another run")]
    LeaseLost,

    #[error("database error: {0}")]
    Database(#[from] DbError),
}

/// Per-run knobs, resolved from config plus the trigger's overrides.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Ignore the freshness window.
    pub force: bool,
    pub strategy: SyncStrategy,
    pub batch_size: usize,
    /// A completed sync younger than this skips the run. `0` disables.
    pub freshness_hours: u32,
    pub lease_secs: u64,
    pub placeholder_image_url: String,
}

impl SyncOptions {
    #[must_use]
    pub fn from_app_config(
        config: &AppConfig,
        force: bool,
        strategy: Option<SyncStrategy>,
    ) -> Self {
        Self {
            force,
            strategy: strategy.unwrap_or(config.sync_strategy),
            batch_size: config.sync_batch_size,
            freshness_hours: config.sync_freshness_hours,
            lease_secs: config.sync_lease_secs,
            placeholder_image_url: config.placeholder_image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// `true` when every batch was written.
    pub success: bool,
    pub total_fetched: usize,
    pub total_with_stock: usize,
    pub total_upserted: u64,
    pub errors: usize,
    pub failed_batches: usize,
    pub stale_deactivated: u64,
    pub products_with_price: usize,
    pub products_with_color: usize,
    pub products_with_size: usize,
    pub products_with_subcategory: usize,
    pub strategy: SyncStrategy,
    pub sync_time: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSync {
    pub last_synced_at: DateTime<Utc>,
    pub next_eligible_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(SyncSummary),
    /// The last completed sync is still within the freshness window.
    Skipped(SkippedSync),
}

/// Runs one product sync end to end.
///
/// # Errors
///
/// - [`SyncError::AlreadyRunning`] if another run holds the lease.
/// - [`SyncError::LeaseLost`] if the lease was taken over before any row
///   was written.
/// - [`SyncError::Zureo`] if the catalog fetch fails. Nothing is written.
/// - [`SyncError::Database`] on status, subcategory or deactivation failures.
pub(crate) async fn run_product_sync<S: SyncStore>(
    store: &S,
    client: &ZureoClient,
    synonyms: &SynonymTable,
    options: &SyncOptions,
) -> Result<SyncOutcome, SyncError> {
    if let Some(skipped) = check_freshness(store, options).await? {
        tracing::info!(
            last_synced_at = %skipped.last_synced_at,
            "product sync skipped; catalog is fresh"
        );
        return Ok(SyncOutcome::Skipped(skipped));
    }

    let lease_secs = i64::try_from(options.lease_secs).unwrap_or(i64::MAX);
    let Some(lease) = store.claim_lease(lease_secs).await? else {
        tracing::warn!("product sync already in progress; not starting another");
        return Err(SyncError::AlreadyRunning);
    };

    let run = run_claimed(store, client, synonyms, options, lease);
    match with_lease_heartbeat(store, lease, lease_secs, run).await {
        Ok(summary) => Ok(SyncOutcome::Completed(summary)),
        Err(e) => {
            tracing::error!(error = %e, "product sync failed");
            match store.fail(lease, &e.to_string()).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("sync lease lost; failure not recorded"),
                Err(mark_err) => {
                    tracing::error!(error = %mark_err, "failed to record sync failure");
                }
            }
            Err(e)
        }
    }
}

/// Drives `run` to completion while renewing `lease` every third of its
/// duration.
async fn with_lease_heartbeat<S, F, T>(store: &S, lease: Uuid, lease_secs: i64, run: F) -> T
where
    S: SyncStore,
    F: std::future::Future<Output = T>,
{
    let every = Duration::from_secs(u64::try_from(lease_secs / 3).unwrap_or(0).max(1));
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tokio::pin!(run);
    loop {
        tokio::select! {
            output = &mut run => return output,
            _ = heartbeat.tick() => match store.renew_lease(lease, lease_secs).await {
                Ok(true) => tracing::debug!("sync lease renewed"),
                Ok(false) => tracing::warn!("sync lease lost to another run"),
                Err(e) => tracing::warn!(error = %e, "failed to renew sync lease"),
            },
        }
    }
}

async fn check_freshness<S: SyncStore>(
    store: &S,
    options: &SyncOptions,
) -> Result<Option<SkippedSync>, SyncError> {
    if options.force || options.freshness_hours == 0 {
        return Ok(None);
    }

    let Some(last_synced_at) = store.last_completed_at().await? else {
        return Ok(None);
    };

    let next_eligible_at =
        last_synced_at + ChronoDuration::hours(i64::from(options.freshness_hours));
    if Utc::now() < next_eligible_at {
        Ok(Some(SkippedSync {
            last_synced_at,
            next_eligible_at,
        }))
    } else {
        Ok(None)
    }
}

async fn run_claimed<S: SyncStore>(
    store: &S,
    client: &ZureoClient,
    synonyms: &SynonymTable,
    options: &SyncOptions,
    lease: Uuid,
) -> Result<SyncSummary, SyncError> {
    let started = Instant::now();
    let sync_time = Utc::now();

    tracing::info!(strategy = %options.strategy, "product sync started");

    let products = client.fetch_all_products(client.settings().page_size).await?;

    let subcategories = store.subcategory_names().await?;
    let mapper = CategoryMapper::new(subcategories, synonyms.clone());
    let ctx = FlattenContext {
        synced_at: sync_time,
        placeholder_image_url: options.placeholder_image_url.clone(),
    };

    let rows: Vec<CatalogRow> = products
        .iter()
        .flat_map(|product| {
            let subcategory = product
                .product_type
                .as_deref()
                .and_then(|label| mapper.map(label));
            flatten_product(product, subcategory.as_deref(), &ctx)
        })
        .collect();
    let rows = dedupe_by_sync_key(rows);

    let mut summary = SyncSummary {
        success: false,
        total_fetched: products.len(),
        total_with_stock: rows.len(),
        total_upserted: 0,
        errors: 0,
        failed_batches: 0,
        stale_deactivated: 0,
        products_with_price: rows.iter().filter(|r| r.has_price()).count(),
        products_with_color: rows.iter().filter(|r| r.color.is_some()).count(),
        products_with_size: rows.iter().filter(|r| r.size.is_some()).count(),
        products_with_subcategory: rows.iter().filter(|r| r.subcategory.is_some()).count(),
        strategy: options.strategy,
        sync_time,
        duration_ms: 0,
    };

    // The catalog is only touched while this run still owns the lease.
    let lease_secs = i64::try_from(options.lease_secs).unwrap_or(i64::MAX);
    if !store.renew_lease(lease, lease_secs).await? {
        return Err(SyncError::LeaseLost);
    }

    let outcome = reconcile(store, rows, options.strategy, options.batch_size).await?;

    let written = outcome.written();
    let recorded = store
        .complete(lease, i32::try_from(written).unwrap_or(i32::MAX))
        .await?;
    if !recorded {
        tracing::warn!(written, "sync lease lost before completion; status not recorded");
    }

    summary.success = outcome.failed_batches == 0;
    summary.total_upserted = written;
    summary.errors = outcome.errors;
    summary.failed_batches = outcome.failed_batches;
    summary.stale_deactivated = outcome.stale;
    summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    tracing::info!(
        fetched = summary.total_fetched,
        with_stock = summary.total_with_stock,
        written,
        errors = summary.errors,
        stale = summary.stale_deactivated,
        duration_ms = summary.duration_ms,
        "product sync complete"
    );

    Ok(summary)
}

/// Runs a product sync against the application's pool and Zureo client.
///
/// # Errors
///
/// [`SyncError::Configuration`] when no Zureo client could be built, plus
/// everything [`run_product_sync`] returns.
pub(crate) async fn trigger_product_sync(
    state: &AppState,
    force: bool,
    strategy: Option<SyncStrategy>,
) -> Result<SyncOutcome, SyncError> {
    let Some(client) = state.zureo.as_deref() else {
        return Err(SyncError::Configuration(missing_client_reason(&state.config)));
    };

    let store = PgSyncStore::new(state.pool.clone());
    let options = SyncOptions::from_app_config(&state.config, force, strategy);
    run_product_sync(&store, client, &state.synonyms, &options).await
}

/// Builds the Zureo client from config, failing fast on missing credentials.
///
/// # Errors
///
/// [`SyncError::Configuration`] for missing credentials, or
/// [`SyncError::Zureo`] for an invalid base URL.
pub(crate) fn build_zureo_client(config: &AppConfig) -> Result<ZureoClient, SyncError> {
    let credentials = config.zureo_credentials()?;
    Ok(ZureoClient::from_app_config(config, credentials)?)
}

fn missing_client_reason(config: &AppConfig) -> ConfigError {
    match config.zureo_credentials() {
        Err(e) => e,
        Ok(_) => ConfigError::Validation(format!(
            "Zureo client could not be built for base URL {}",
            config.zureo_base_url
        )),
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
