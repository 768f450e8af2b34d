//! Sync trigger and status handlers.
//!
//! - `GET|POST /api/v1/sync/products?force=&strategy=` runs a product sync
//! - `GET /api/v1/sync/status` reports the last run

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::{SyncStatusKind, SyncStrategy, PRODUCTS_SYNC_TYPE};

use crate::middleware::RequestId;
use crate::sync::SyncOutcome;

use super::{map_db_error, map_sync_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SyncQuery {
    pub force: Option<bool>,
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncStatusItem {
    sync_type: String,
    status: String,
    /// `true` only while an unexpired lease is held.
    running: bool,
    last_synced_at: Option<DateTime<Utc>>,
    total_records: i32,
    started_at: Option<DateTime<Utc>>,
    lease_expires_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    updated_at: DateTime<Utc>,
}

pub(super) async fn trigger_product_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<ApiResponse<SyncOutcome>>, ApiError> {
    let strategy = query
        .strategy
        .as_deref()
        .map(str::parse::<SyncStrategy>)
        .transpose()
        .map_err(|reason| ApiError::new(req_id.0.clone(), "validation_error", reason))?;

    // Detached from the request future: a dropped connection must not abort
    // the run between its catalog writes and its status write.
    let force = query.force.unwrap_or(false);
    let run = tokio::spawn(async move {
        crate::sync::trigger_product_sync(&state, force, strategy).await
    });
    let outcome = run
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "product sync task did not finish");
            ApiError::new(req_id.0.clone(), "internal_error", "product sync task failed")
        })?
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_sync_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Option<SyncStatusItem>>>, ApiError> {
    let row = vitrina_db::get_sync_status(&state.pool, PRODUCTS_SYNC_TYPE)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let now = Utc::now();
    let data = row.map(|row| SyncStatusItem {
        running: row.kind() == Some(SyncStatusKind::InProgress)
            && row.lease_expires_at.is_some_and(|at| at > now),
        sync_type: row.sync_type,
        status: row.status,
        last_synced_at: row.last_synced_at,
        total_records: row.total_records,
        started_at: row.started_at,
        lease_expires_at: row.lease_expires_at,
        error_message: row.error_message,
        updated_at: row.updated_at,
    });

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
