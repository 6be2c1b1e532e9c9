//! Handlers for inspecting and cancelling background jobs.

use addonlog_core::error::CoreError;
use addonlog_core::types::DbId;
use addonlog_db::models::background_job::JobListQuery;
use addonlog_db::repositories::BackgroundJobRepo;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/jobs?status=&limit=&offset=
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = BackgroundJobRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /admin/jobs/{id}/cancel
///
/// Only pending or running jobs can be cancelled; anything else is a 409.
pub async fn cancel_job(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = BackgroundJobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("BackgroundJob", id)))?;

    if !BackgroundJobRepo::cancel(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Job {id} is already {}",
            job.status
        ))));
    }
    tracing::info!(job_id = id, user_id = admin.user_id, "Background job cancelled");

    let job = BackgroundJobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("BackgroundJob", id)))?;
    Ok(Json(DataResponse { data: job }))
}
