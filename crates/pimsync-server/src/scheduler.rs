//! Background job scheduler.
//!
//! Registers one cron job per sync job. A tick that finds its job already
//! running (via the API or a slow previous tick) is skipped.

use std::sync::Arc;

use pimsync_core::AppConfig;
use pimsync_sync::{run_with_history, JobKind, SyncContext};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::locks::JobLocks;

/// Builds and starts the scheduler. Dropping the returned handle stops all
/// jobs, so keep it alive for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid, a job
/// cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    config: &AppConfig,
    pool: PgPool,
    sync: Arc<SyncContext>,
    locks: JobLocks,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    for job in JobKind::ALL {
        let cron = cron_for(config, job);
        register_sync_job(
            &scheduler,
            job,
            cron,
            pool.clone(),
            Arc::clone(&sync),
            locks.clone(),
        )
        .await?;
        tracing::info!(job = %job, cron, "scheduler: job registered");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

fn cron_for(config: &AppConfig, job: JobKind) -> &str {
    match job {
        JobKind::Catalog => &config.catalog_cron,
        JobKind::BuyPrices => &config.buy_price_cron,
        JobKind::Data => &config.data_cron,
    }
}

async fn register_sync_job(
    scheduler: &JobScheduler,
    job: JobKind,
    cron: &str,
    pool: PgPool,
    sync: Arc<SyncContext>,
    locks: JobLocks,
) -> Result<(), JobSchedulerError> {
    let job_def = Job::new_async(cron, move |_uuid, _lock| {
        let pool = pool.clone();
        let sync = Arc::clone(&sync);
        let locks = locks.clone();

        Box::pin(async move {
            let Some(_guard) = locks.try_acquire(job) else {
                tracing::warn!(job = %job, "scheduler: previous run still active; skipping");
                return;
            };
            tracing::info!(job = %job, "scheduler: starting run");
            let result =
                run_with_history(&pool, job, "scheduler", || async move { sync.run(job).await })
                    .await;
            tracing::info!(
                job = %job,
                status = ?result.status,
                succeeded = result.succeeded,
                failed = result.failed,
                duration = %result.duration,
                "scheduler: run complete"
            );
        })
    })?;

    scheduler.add(job_def).await?;
    Ok(())
}
