//! Signed upload URL issuance.
//!
//! Issuance is side-effect free: nothing is written to the ledger, so a
//! device may request fresh URLs for the same slot any number of times.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use facet_core::models::{ErrorResponse, ImageKind, SignedUpload, SignedUrlsRequest, SignedUrlsResponse};
use facet_core::paths::{validate_coordinate, SlotPaths};
use facet_core::AppError;
use std::sync::Arc;
use std::time::Duration;

const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";

/// Issue signed PUT URLs for one slot's storage objects.
#[utoipa::path(
    post,
    path = "/storage/signed-urls",
    tag = "storage",
    request_body = SignedUrlsRequest,
    responses(
        (status = 200, description = "Signed URLs issued", body = SignedUrlsResponse),
        (status = 404, description = "Job or organization not found", body = ErrorResponse),
        (status = 409, description = "Job no longer accepts ingestion", body = ErrorResponse),
        (status = 502, description = "Storage backend unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        org_slug = %request.org_slug,
        job_id = %request.job_id,
        ring_label = %request.ring_label,
        slot_index = request.slot_index,
        operation = "issue_signed_urls"
    )
)]
pub async fn issue_signed_urls(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignedUrlsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_coordinate(&request.org_slug, &request.ring_label, request.slot_index)?;

    let org = state.orgs.require_by_slug(&request.org_slug).await?;

    let job = state
        .jobs
        .find(request.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", request.job_id)))?;

    if job.org_id != org.id {
        return Err(AppError::Forbidden(format!(
            "Job {} does not belong to organization '{}'",
            request.job_id, request.org_slug
        ))
        .into());
    }

    if !job.status()?.accepts_ingestion() {
        return Err(AppError::job_not_accepting(format!(
            "Job {} is {} and no longer accepts uploads",
            job.id, job.status
        ))
        .into());
    }

    let paths = SlotPaths::for_slot(
        &request.org_slug,
        request.job_id,
        &request.ring_label,
        request.slot_index,
    );
    let ttl = Duration::from_secs(state.config.upload_url_ttl_seconds);

    let mut uploads = Vec::new();
    for kind in ImageKind::ALL {
        if !request.mode.includes(kind) {
            continue;
        }
        let path = paths.for_kind(kind);
        let storage = if kind.is_original() {
            &state.originals
        } else {
            &state.previews
        };
        let signed_url = storage
            .presigned_put_url(path, UPLOAD_CONTENT_TYPE, ttl)
            .await?;
        uploads.push(SignedUpload {
            kind,
            path: path.to_string(),
            signed_url,
        });
    }

    tracing::debug!(count = uploads.len(), "Signed upload URLs issued");

    Ok(Json(SignedUrlsResponse {
        job_id: request.job_id,
        uploads,
    }))
}
