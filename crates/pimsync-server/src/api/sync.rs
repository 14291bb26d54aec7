use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use pimsync_sync::{run_with_history, JobKind, SyncReport, SyncResult};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

pub(super) async fn sync_catalog(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    run_job(state, req_id, JobKind::Catalog).await
}

pub(super) async fn sync_buy_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    run_job(state, req_id, JobKind::BuyPrices).await
}

pub(super) async fn sync_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    run_job(state, req_id, JobKind::Data).await
}

/// Runs `job` to completion and returns the full result as the body.
///
/// The run executes on its own task together with the job lock, so a
/// caller that disconnects does not stop it between writes.
async fn run_job(state: AppState, req_id: RequestId, job: JobKind) -> Response {
    let Some(guard) = state.locks.try_acquire(job) else {
        tracing::warn!(job = %job, request_id = %req_id.0, "sync rejected: already running");
        return ApiError::new(req_id.0, "conflict", format!("{job} sync is already running"))
            .into_response();
    };

    tracing::info!(job = %job, request_id = %req_id.0, "sync requested");
    let AppState { pool, sync, .. } = state;
    let task = tokio::spawn(async move {
        let _guard = guard;
        run_with_history(&pool, job, "api", || async move { sync.run(job).await }).await
    });

    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(job = %job, request_id = %req_id.0, error = %e, "sync task failed");
            SyncReport::start(job).fatal(format!("sync task failed: {e}"))
        }
    };
    tracing::info!(
        job = %job,
        request_id = %req_id.0,
        status = ?result.status,
        succeeded = result.succeeded,
        failed = result.failed,
        duration = %result.duration,
        "sync finished"
    );

    (status_for(&result), Json(result)).into_response()
}

fn status_for(result: &SyncResult) -> StatusCode {
    match (result.success, result.errors.is_empty()) {
        (true, true) => StatusCode::OK,
        (true, false) => StatusCode::MULTI_STATUS,
        (false, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
