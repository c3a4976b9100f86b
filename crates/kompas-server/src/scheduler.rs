//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring place-index refresh.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::{reload_place_index, AppState};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `refresh_cron` is not a valid schedule, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    refresh_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_place_refresh_job(&scheduler, state, refresh_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the place-index refresh job. A failed run keeps the previous
/// snapshot.
async fn register_place_refresh_job(
    scheduler: &JobScheduler,
    state: AppState,
    refresh_cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(refresh_cron, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            if let Err(e) = reload_place_index(&state).await {
                tracing::error!(error = %e, "scheduler: place index refresh failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = refresh_cron, "scheduler: place index refresh registered");
    Ok(())
}
