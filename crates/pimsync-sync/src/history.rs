//! Records job invocations in `sync_runs`.
//!
//! Recording is best effort: a history write that fails is logged and the
//! job result is returned unchanged.

use std::future::Future;

use sqlx::PgPool;

use crate::jobs::JobKind;
use crate::report::SyncResult;

/// Runs `job` between `create → start` and `complete | fail` of a history
/// row. `trigger` is `api`, `scheduler` or `cli`.
pub async fn run_with_history<F, Fut>(
    pool: &PgPool,
    job: JobKind,
    trigger: &str,
    run: F,
) -> SyncResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = SyncResult>,
{
    let run_id = begin(pool, job, trigger).await;
    let result = run().await;
    if let Some(id) = run_id {
        finish(pool, id, &result).await;
    }
    result
}

async fn begin(pool: &PgPool, job: JobKind, trigger: &str) -> Option<i64> {
    let row = match pimsync_db::create_sync_run(pool, job.as_str(), trigger).await {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!(job = %job, error = %e, "failed to record sync run");
            return None;
        }
    };
    if let Err(e) = pimsync_db::start_sync_run(pool, row.id).await {
        tracing::warn!(job = %job, run_id = row.id, error = %e, "failed to mark sync run running");
        return None;
    }
    tracing::debug!(job = %job, run_id = row.id, public_id = %row.public_id, "sync run started");
    Some(row.id)
}

async fn finish(pool: &PgPool, run_id: i64, result: &SyncResult) {
    let summary = match serde_json::to_value(result) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(run_id, error = %e, "failed to serialize sync result");
            serde_json::Value::Null
        }
    };

    let outcome = if result.success {
        let processed = i32::try_from(result.succeeded).unwrap_or(i32::MAX);
        pimsync_db::complete_sync_run(pool, run_id, processed, &summary).await
    } else {
        let message = result
            .errors
            .first()
            .map_or("sync failed", String::as_str);
        pimsync_db::fail_sync_run(pool, run_id, message, Some(&summary)).await
    };

    if let Err(e) = outcome {
        tracing::error!(run_id, job = %result.job, error = %e, "failed to finalize sync run");
    }
}
