//! Job lifecycle handlers.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use facet_core::models::{
    ErrorResponse, JobAction, JobActionRequest, JobActionResponse, StartJobRequest,
    StartJobResponse,
};
use facet_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Start a new scan job. The job begins accepting slot ingestion immediately.
/// Passing `client_job_id` makes the call idempotent: a replayed start with
/// the same key returns the job the first call created.
#[utoipa::path(
    post,
    path = "/jobs/start",
    tag = "jobs",
    request_body = StartJobRequest,
    responses(
        (status = 200, description = "Job started", body = StartJobResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 401, description = "Missing or invalid device key", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(org_slug = %request.org_slug, operation = "start_job"))]
pub async fn start_job(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<StartJobRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let org = state.orgs.require_by_slug(&request.org_slug).await?;

    let device_id = match request.device_name.as_deref() {
        Some(name) => Some(state.devices.get_or_create(org.id, name).await?.id),
        None => None,
    };

    let job = state
        .jobs
        .create(
            org.id,
            device_id,
            request.external_ref.as_deref(),
            request.client_job_id,
        )
        .await?;

    tracing::info!(job_id = %job.id, org_slug = %request.org_slug, "Scan job started");

    Ok(Json(StartJobResponse {
        job_id: job.id,
        status: job.status()?,
    }))
}

/// Resolve the job, check ownership, and apply one lifecycle action.
async fn apply_job_action(
    state: &AppState,
    job_id: Uuid,
    org_slug: &str,
    action: JobAction,
) -> Result<JobActionResponse, AppError> {
    let org = state.orgs.require_by_slug(org_slug).await?;

    let job = state
        .jobs
        .find(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    if job.org_id != org.id {
        return Err(AppError::Forbidden(format!(
            "Job {} does not belong to organization '{}'",
            job_id, org_slug
        )));
    }

    let job = state.jobs.apply_action(job_id, action).await?;
    let status = job.status()?;

    tracing::info!(job_id = %job_id, action = action.as_str(), status = %status, "Job transition applied");

    Ok(JobActionResponse { job_id, status })
}

/// Pause a scanning job. Ingestion of already captured slots continues.
#[utoipa::path(
    post,
    path = "/jobs/{job_id}/pause",
    tag = "jobs",
    params(("job_id" = Uuid, Path, description = "Job identifier")),
    request_body = JobActionRequest,
    responses(
        (status = 200, description = "Job paused", body = JobActionResponse),
        (status = 404, description = "Job or organization not found", body = ErrorResponse),
        (status = 409, description = "Job is not in a pausable status", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(job_id = %job_id, operation = "pause_job"))]
pub async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<JobActionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = apply_job_action(&state, job_id, &request.org_slug, JobAction::Pause).await?;
    Ok(Json(response))
}

/// Resume a paused job.
#[utoipa::path(
    post,
    path = "/jobs/{job_id}/resume",
    tag = "jobs",
    params(("job_id" = Uuid, Path, description = "Job identifier")),
    request_body = JobActionRequest,
    responses(
        (status = 200, description = "Job resumed", body = JobActionResponse),
        (status = 404, description = "Job or organization not found", body = ErrorResponse),
        (status = 409, description = "Job is not paused", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(job_id = %job_id, operation = "resume_job"))]
pub async fn resume_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<JobActionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = apply_job_action(&state, job_id, &request.org_slug, JobAction::Resume).await?;
    Ok(Json(response))
}

/// Stop a job. The job moves to PROCESSING and stops accepting new slots;
/// in-flight original uploads may still be confirmed afterwards.
#[utoipa::path(
    post,
    path = "/jobs/{job_id}/stop",
    tag = "jobs",
    params(("job_id" = Uuid, Path, description = "Job identifier")),
    request_body = JobActionRequest,
    responses(
        (status = 200, description = "Job stopped", body = JobActionResponse),
        (status = 404, description = "Job or organization not found", body = ErrorResponse),
        (status = 409, description = "Job already stopped", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(job_id = %job_id, operation = "stop_job"))]
pub async fn stop_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<JobActionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = apply_job_action(&state, job_id, &request.org_slug, JobAction::Stop).await?;
    Ok(Json(response))
}
