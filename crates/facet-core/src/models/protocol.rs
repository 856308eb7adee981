//! Request/response DTOs for the ingestion protocol.
//!
//! These shapes are shared verbatim by the server handlers and the device
//! client so the two sides cannot drift.

use crate::models::{ImageKind, ImageType, JobStatus, SignedUrlMode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ----------------------------
// Job lifecycle
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StartJobRequest {
    #[validate(length(min = 1))]
    pub org_slug: String,
    pub device_name: Option<String>,
    /// Caller-supplied correlation id (order number, tray barcode, ...).
    pub external_ref: Option<String>,
    /// Client-chosen idempotency key. A start replayed with the same key
    /// returns the job created by the first attempt instead of a new one.
    pub client_job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct JobActionRequest {
    #[validate(length(min = 1))]
    pub org_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobActionResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

// ----------------------------
// Signed upload/download URLs
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignedUrlsRequest {
    #[validate(length(min = 1))]
    pub org_slug: String,
    pub job_id: Uuid,
    #[validate(length(min = 1))]
    pub ring_label: String,
    #[validate(range(min = 0))]
    pub slot_index: i32,
    pub mode: SignedUrlMode,
}

/// One (path, signed URL) pair. The URL is single-use and time-limited;
/// callers must not cache it across sync passes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignedUpload {
    pub kind: ImageKind,
    pub path: String,
    pub signed_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignedUrlsResponse {
    pub job_id: Uuid,
    /// Up to four entries depending on the requested mode.
    pub uploads: Vec<SignedUpload>,
}

impl SignedUrlsResponse {
    pub fn upload_for(&self, kind: ImageKind) -> Option<&SignedUpload> {
        self.uploads.iter().find(|u| u.kind == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignedDownloadRequest {
    #[validate(length(min = 1))]
    pub org_slug: String,
    #[validate(length(min = 1))]
    pub bucket: String,
    #[validate(length(min = 1))]
    pub storage_path: String,
    #[serde(default = "default_download_ttl")]
    #[validate(range(min = 1, max = 86400))]
    pub expires_in: u64,
}

fn default_download_ttl() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignedDownloadResponse {
    pub signed_url: String,
}

// ----------------------------
// Ingestion
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct IngestScanRequest {
    #[validate(length(min = 1))]
    pub org_slug: String,
    pub job_id: Uuid,
    #[validate(length(min = 1))]
    pub ring_label: String,
    #[validate(range(min = 0))]
    pub slot_index: i32,
    pub device_name: Option<String>,

    /// Original paths as returned by the signed-urls step. The server
    /// recomputes the canonical paths and rejects anything that differs.
    #[validate(length(min = 1))]
    pub uv_free_path: String,
    #[validate(length(min = 1))]
    pub aset_path: String,

    /// Preview paths, present only when the previews were already PUT to
    /// their signed URLs. Their presence is what flips `preview_ready`.
    pub uv_free_preview_path: Option<String>,
    pub aset_preview_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestScanResponse {
    pub job_id: Uuid,
    pub ring_id: Uuid,
    pub diamond_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmOriginalsRequest {
    #[validate(length(min = 1))]
    pub org_slug: String,
    pub job_id: Uuid,
    #[validate(length(min = 1))]
    pub ring_label: String,
    #[validate(range(min = 0))]
    pub slot_index: i32,
    /// Which image types to verify. Callers may confirm one type at a time.
    #[validate(length(min = 1))]
    pub image_types: Vec<ImageType>,
}

/// The full confirmed/missing split for the requested types. "Missing" is an
/// expected steady state while uploads are in flight, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmOriginalsResponse {
    pub confirmed: Vec<ImageType>,
    pub missing: Vec<ImageType>,
}

// ----------------------------
// Error body
// ----------------------------

/// Error body returned by every endpoint. `code` is machine-readable and is
/// what the device sync engine keys its retry/drop policy on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub code: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_negative_slot_index_fails_validation() {
        let req = SignedUrlsRequest {
            org_slug: "acme".to_string(),
            job_id: Uuid::new_v4(),
            ring_label: "A".to_string(),
            slot_index: -1,
            mode: SignedUrlMode::Both,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_confirm_request_requires_image_types() {
        let req = ConfirmOriginalsRequest {
            org_slug: "acme".to_string(),
            job_id: Uuid::new_v4(),
            ring_label: "A".to_string(),
            slot_index: 0,
            image_types: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_download_request_defaults_ttl() {
        let req: SignedDownloadRequest = serde_json::from_str(
            r#"{"org_slug":"acme","bucket":"diamond-images","storage_path":"acme/x/y.jpg"}"#,
        )
        .unwrap();
        assert_eq!(req.expires_in, 600);
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse {
            error: "diamond already exists for this slot".to_string(),
            details: None,
            error_type: None,
            code: "DIAMOND_EXISTS".to_string(),
            recoverable: false,
            suggested_action: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "DIAMOND_EXISTS");
        assert_eq!(json["recoverable"], false);
        assert!(json.get("details").is_none());
    }
}
