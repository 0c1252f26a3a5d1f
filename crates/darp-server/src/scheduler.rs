//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! nightly expiry sweep that deletes auctions whose expiration date has
//! passed.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised
/// or started.
pub async fn build_scheduler(pool: PgPool) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_expiry_sweep_job(&scheduler, pool).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the nightly expiry sweep.
///
/// Runs at 03:00 UTC by default (`0 0 3 * * *`) and can be overridden
/// with `DARP_EXPIRY_SWEEP_CRON`.
async fn register_expiry_sweep_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("DARP_EXPIRY_SWEEP_CRON").unwrap_or_else(|_| "0 0 3 * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            tracing::info!("scheduler: starting expiry sweep");
            match darp_db::delete_expired_auctions(&pool).await {
                Ok(deleted) => {
                    tracing::info!(deleted, "scheduler: expiry sweep complete");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: expiry sweep failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered expiry sweep job");
    Ok(())
}
