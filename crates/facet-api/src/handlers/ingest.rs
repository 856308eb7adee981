//! Ledger ingestion: record a scanned slot, then confirm its originals.
//!
//! `ingest_scan` records the diamond and its image rows idempotently; a
//! replay hits the (job, ring, slot) unique constraint and comes back as
//! DIAMOND_EXISTS. `confirm_originals` is the only place `original_ready`
//! flips, and only after the storage oracle has seen the object.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use facet_core::models::{
    ConfirmOriginalsRequest, ConfirmOriginalsResponse, ErrorResponse, ImageKind, ImageType,
    IngestScanRequest, IngestScanResponse,
};
use facet_core::paths::{path_owned_by, validate_coordinate, SlotPaths};
use facet_core::AppError;
use facet_db::{JobRow, NewDiamondImage, OrgRow};
use std::sync::Arc;
use uuid::Uuid;

/// Resolve org and job and enforce ownership.
async fn resolve_owned_job(
    state: &AppState,
    org_slug: &str,
    job_id: Uuid,
) -> Result<(OrgRow, JobRow), AppError> {
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

    Ok((org, job))
}

/// A submitted path must sit inside the caller's coordinate prefix
/// (authorization) and match the canonical path exactly (consistency).
fn check_submitted_path(
    submitted: &str,
    canonical: &str,
    org_slug: &str,
    job_id: Uuid,
    kind: ImageKind,
) -> Result<(), AppError> {
    if !path_owned_by(submitted, org_slug, job_id) {
        return Err(AppError::Forbidden(format!(
            "Path '{}' is outside this job's storage prefix",
            submitted
        )));
    }
    if submitted.trim_start_matches('/') != canonical {
        return Err(AppError::InvalidInput(format!(
            "Path '{}' does not match the canonical {} path '{}'",
            submitted,
            kind.suffix(),
            canonical
        )));
    }
    Ok(())
}

/// Record one scanned slot in the ledger.
#[utoipa::path(
    post,
    path = "/ingest/scan",
    tag = "ingest",
    request_body = IngestScanRequest,
    responses(
        (status = 200, description = "Slot recorded", body = IngestScanResponse),
        (status = 403, description = "Path outside the job's storage prefix", body = ErrorResponse),
        (status = 404, description = "Job or organization not found", body = ErrorResponse),
        (status = 409, description = "Slot already recorded or job stopped", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        org_slug = %request.org_slug,
        job_id = %request.job_id,
        ring_label = %request.ring_label,
        slot_index = request.slot_index,
        operation = "ingest_scan"
    )
)]
pub async fn ingest_scan(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<IngestScanRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_coordinate(&request.org_slug, &request.ring_label, request.slot_index)?;

    let (org, job) = resolve_owned_job(&state, &request.org_slug, request.job_id).await?;

    if !job.status()?.accepts_ingestion() {
        return Err(AppError::job_not_accepting(format!(
            "Job {} is {} and no longer accepts ingestion",
            job.id, job.status
        ))
        .into());
    }

    let canonical = SlotPaths::for_slot(
        &request.org_slug,
        request.job_id,
        &request.ring_label,
        request.slot_index,
    );

    check_submitted_path(
        &request.uv_free_path,
        &canonical.uv_free,
        &request.org_slug,
        request.job_id,
        ImageKind::UvFree,
    )?;
    check_submitted_path(
        &request.aset_path,
        &canonical.aset,
        &request.org_slug,
        request.job_id,
        ImageKind::Aset,
    )?;
    if let Some(ref path) = request.uv_free_preview_path {
        check_submitted_path(
            path,
            &canonical.uv_free_thumb,
            &request.org_slug,
            request.job_id,
            ImageKind::UvFreeThumb,
        )?;
    }
    if let Some(ref path) = request.aset_preview_path {
        check_submitted_path(
            path,
            &canonical.aset_thumb,
            &request.org_slug,
            request.job_id,
            ImageKind::AsetThumb,
        )?;
    }

    if let Some(name) = request.device_name.as_deref() {
        state.devices.get_or_create(org.id, name).await?;
    }

    let ring = state
        .rings
        .get_or_create(request.job_id, &request.ring_label)
        .await?;

    let images = [
        NewDiamondImage {
            image_type: ImageType::UvFree,
            storage_path: canonical.uv_free.clone(),
            preview_storage_path: request
                .uv_free_preview_path
                .is_some()
                .then(|| canonical.uv_free_thumb.clone()),
            preview_ready: request.uv_free_preview_path.is_some(),
        },
        NewDiamondImage {
            image_type: ImageType::Aset,
            storage_path: canonical.aset.clone(),
            preview_storage_path: request
                .aset_preview_path
                .is_some()
                .then(|| canonical.aset_thumb.clone()),
            preview_ready: request.aset_preview_path.is_some(),
        },
    ];

    let diamond = state
        .diamonds
        .create_with_images(request.job_id, ring.id, request.slot_index, &images)
        .await?;

    tracing::info!(
        diamond_id = %diamond.id,
        ring_id = %ring.id,
        "Slot recorded in ledger"
    );

    Ok(Json(IngestScanResponse {
        job_id: request.job_id,
        ring_id: ring.id,
        diamond_id: diamond.id,
    }))
}

/// Verify original uploads against the storage oracle and flip readiness.
///
/// Allowed in any job status: original uploads routinely finish after the
/// job has been stopped.
#[utoipa::path(
    post,
    path = "/ingest/confirm-originals",
    tag = "ingest",
    request_body = ConfirmOriginalsRequest,
    responses(
        (status = 200, description = "Confirmation result per image type", body = ConfirmOriginalsResponse),
        (status = 404, description = "Slot not recorded yet", body = ErrorResponse),
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
        operation = "confirm_originals"
    )
)]
pub async fn confirm_originals(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConfirmOriginalsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_coordinate(&request.org_slug, &request.ring_label, request.slot_index)?;

    let (_org, _job) = resolve_owned_job(&state, &request.org_slug, request.job_id).await?;

    let ring = state
        .rings
        .find(request.job_id, &request.ring_label)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Ring '{}' not recorded for job {}",
                request.ring_label, request.job_id
            ))
        })?;

    let diamond = state
        .diamonds
        .find_by_coordinate(request.job_id, ring.id, request.slot_index)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Slot {} of ring '{}' not recorded for job {}",
                request.slot_index, request.ring_label, request.job_id
            ))
        })?;

    let mut requested: Vec<ImageType> = Vec::new();
    for image_type in &request.image_types {
        if !requested.contains(image_type) {
            requested.push(*image_type);
        }
    }

    let mut confirmed = Vec::new();
    let mut missing = Vec::new();

    for image_type in requested {
        let image = state
            .diamonds
            .image_for(diamond.id, image_type)
            .await?
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Diamond {} has no {} image to confirm",
                    diamond.id, image_type
                ))
            })?;

        // Readiness is monotonic: once confirmed, stay confirmed without
        // consulting the oracle again.
        if image.original_ready {
            confirmed.push(image_type);
            continue;
        }

        if state.originals.exists(&image.storage_path).await? {
            state
                .diamonds
                .mark_original_ready(diamond.id, image_type)
                .await?;
            confirmed.push(image_type);
        } else {
            missing.push(image_type);
        }
    }

    tracing::info!(
        diamond_id = %diamond.id,
        confirmed = confirmed.len(),
        missing = missing.len(),
        "Originals confirmation pass complete"
    );

    Ok(Json(ConfirmOriginalsResponse { confirmed, missing }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_org_and_job, slot_ingest_request, test_app};
    use facet_core::models::JobAction;
    use facet_core::ErrorMetadata;
    use sqlx::PgPool;

    #[test]
    fn test_submitted_path_checks() {
        let job_id = Uuid::new_v4();
        let canonical = facet_core::paths::object_path("acme", job_id, "A", 0, ImageKind::UvFree);

        assert!(
            check_submitted_path(&canonical, &canonical, "acme", job_id, ImageKind::UvFree)
                .is_ok()
        );

        // Another org's prefix is an authorization failure, not a validation one.
        let foreign = format!("other/{}/A/slot_0_uv_free.jpg", job_id);
        let err = check_submitted_path(&foreign, &canonical, "acme", job_id, ImageKind::UvFree)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Inside the prefix but not the canonical path is a validation failure.
        let in_prefix = format!("acme/{}/A/slot_0_custom.jpg", job_id);
        let err = check_submitted_path(&in_prefix, &canonical, "acme", job_id, ImageKind::UvFree)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    async fn confirm_response(
        state: &Arc<AppState>,
        request: ConfirmOriginalsRequest,
    ) -> ConfirmOriginalsResponse {
        let response = match confirm_originals(State(state.clone()), ValidatedJson(request)).await {
            Ok(response) => response.into_response(),
            Err(err) => panic!("confirm_originals failed: {:?}", err.0),
        };
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_replayed_ingest_conflicts_without_second_diamond(pool: PgPool) {
        let app = test_app(pool.clone());
        let (_org, job) = seed_org_and_job(&app.state, "acme").await;
        let request = slot_ingest_request("acme", job.id, "A", 0);

        let first = ingest_scan(State(app.state.clone()), ValidatedJson(request.clone())).await;
        assert!(first.is_ok());

        let err = match ingest_scan(State(app.state.clone()), ValidatedJson(request)).await {
            Ok(_) => panic!("replayed ingest must conflict"),
            Err(err) => err.0,
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "DIAMOND_EXISTS");

        // The replay left the ledger as the first ingest wrote it.
        let diamond_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diamonds")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(diamond_count, 1);
        let image_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diamond_images")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(image_count, 2);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_ingestion_gate_follows_job_status(pool: PgPool) {
        let app = test_app(pool);
        let (org, job) = seed_org_and_job(&app.state, "acme").await;

        // Paused jobs still accept slots captured before the pause.
        app.state
            .jobs
            .apply_action(job.id, JobAction::Pause)
            .await
            .unwrap();
        let result = ingest_scan(
            State(app.state.clone()),
            ValidatedJson(slot_ingest_request("acme", job.id, "A", 0)),
        )
        .await;
        assert!(result.is_ok());

        // Stopped jobs do not.
        let stopped = app.state.jobs.create(org.id, None, None, None).await.unwrap();
        app.state
            .jobs
            .apply_action(stopped.id, JobAction::Stop)
            .await
            .unwrap();
        let err = match ingest_scan(
            State(app.state.clone()),
            ValidatedJson(slot_ingest_request("acme", stopped.id, "A", 0)),
        )
        .await
        {
            Ok(_) => panic!("stopped job must not accept ingestion"),
            Err(err) => err.0,
        };
        assert_eq!(err.error_code(), "JOB_NOT_ACCEPTING");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_confirm_without_uploads_mutates_nothing(pool: PgPool) {
        let app = test_app(pool.clone());
        let (_org, job) = seed_org_and_job(&app.state, "acme").await;

        let ingest = slot_ingest_request("acme", job.id, "A", 0);
        let uv_free_path = ingest.uv_free_path.clone();
        let recorded = ingest_scan(State(app.state.clone()), ValidatedJson(ingest)).await;
        assert!(recorded.is_ok());

        let request = ConfirmOriginalsRequest {
            org_slug: "acme".to_string(),
            job_id: job.id,
            ring_label: "A".to_string(),
            slot_index: 0,
            image_types: vec![ImageType::UvFree, ImageType::Aset],
        };

        // Nothing uploaded yet: both types come back missing and the ledger
        // rows stay untouched.
        let response = confirm_response(&app.state, request.clone()).await;
        assert!(response.confirmed.is_empty());
        assert_eq!(response.missing.len(), 2);

        let flipped_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM diamond_images \
             WHERE original_ready OR original_uploaded_at IS NOT NULL",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(flipped_count, 0);

        // One original lands in storage: exactly that type flips.
        app.originals.insert(&uv_free_path);
        let response = confirm_response(&app.state, request).await;
        assert_eq!(response.confirmed, vec![ImageType::UvFree]);
        assert_eq!(response.missing, vec![ImageType::Aset]);
    }
}
