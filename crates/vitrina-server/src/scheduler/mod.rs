//! Background job scheduler.
//!
//! Registers the recurring product sync at server startup. Scheduled runs
//! honour the freshness window and the run lease, so they never overlap with
//! a manual trigger.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;
use crate::sync::{trigger_product_sync, SyncError, SyncOutcome};

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(state: AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_product_sync_job(&scheduler, state).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the product sync on `sync_schedule` (daily at 04:00 UTC by default).
async fn register_product_sync_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let cron = state.config.sync_schedule.clone();

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting product sync run");
            run_product_sync_job(&state).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered product sync job");
    Ok(())
}

async fn run_product_sync_job(state: &AppState) {
    match trigger_product_sync(state, false, None).await {
        Ok(SyncOutcome::Completed(summary)) => tracing::info!(
            upserted = summary.total_upserted,
            errors = summary.errors,
            stale_deactivated = summary.stale_deactivated,
            duration_ms = summary.duration_ms,
            "scheduler: product sync run complete"
        ),
        Ok(SyncOutcome::Skipped(skipped)) => tracing::info!(
            last_synced_at = %skipped.last_synced_at,
            next_eligible_at = %skipped.next_eligible_at,
            "scheduler: catalog still fresh; skipping product sync"
        ),
        Err(SyncError::AlreadyRunning) => {
            tracing::info!("scheduler: product sync already running; skipping");
        }
        Err(e) => tracing::error!(error = %e, "scheduler: product sync run failed"),
    }
}
