//! Signed download URLs for recorded objects.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use facet_core::models::{ErrorResponse, SignedDownloadRequest, SignedDownloadResponse};
use facet_core::AppError;
use std::sync::Arc;
use std::time::Duration;

/// Strip a leading slash and an accidental bucket-name prefix so stored
/// ledger paths and full object references both resolve.
fn normalize_storage_path<'a>(path: &'a str, bucket: &str) -> &'a str {
    let path = path.trim_start_matches('/');
    match path.strip_prefix(bucket).and_then(|r| r.strip_prefix('/')) {
        Some(rest) => rest,
        None => path,
    }
}

/// Mint a time-limited signed GET URL for one stored object.
#[utoipa::path(
    post,
    path = "/storage/signed-download",
    tag = "storage",
    request_body = SignedDownloadRequest,
    responses(
        (status = 200, description = "Signed download URL", body = SignedDownloadResponse),
        (status = 403, description = "Path outside the organization's prefix", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 502, description = "Storage backend unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(org_slug = %request.org_slug, bucket = %request.bucket, operation = "signed_download")
)]
pub async fn signed_download(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignedDownloadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.orgs.require_by_slug(&request.org_slug).await?;

    let storage = state.storage_for_bucket(&request.bucket).ok_or_else(|| {
        AppError::InvalidInput(format!("Unknown bucket '{}'", request.bucket))
    })?;

    let path = normalize_storage_path(&request.storage_path, &request.bucket);

    if !path.starts_with(&format!("{}/", request.org_slug)) {
        return Err(AppError::Forbidden(format!(
            "Path '{}' is outside organization '{}'",
            request.storage_path, request.org_slug
        ))
        .into());
    }

    let signed_url = storage
        .presigned_get_url(path, Duration::from_secs(request.expires_in))
        .await?;

    Ok(Json(SignedDownloadResponse { signed_url }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_storage_path() {
        assert_eq!(
            normalize_storage_path("acme/j/A/slot_0_aset.jpg", "diamond-images"),
            "acme/j/A/slot_0_aset.jpg"
        );
        assert_eq!(
            normalize_storage_path("/acme/j/A/slot_0_aset.jpg", "diamond-images"),
            "acme/j/A/slot_0_aset.jpg"
        );
        assert_eq!(
            normalize_storage_path("diamond-images/acme/j/x.jpg", "diamond-images"),
            "acme/j/x.jpg"
        );
    }
}
