//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::handlers;
use facet_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Facet Ingestion API",
        version = "0.1.0",
        description = "Scan-ingestion API for field devices: job lifecycle, signed upload URLs, ledger ingestion, and storage-verified original confirmation. All endpoints except /health require the X-Device-Key header."
    ),
    paths(
        handlers::health::health_check,
        handlers::jobs::start_job,
        handlers::jobs::pause_job,
        handlers::jobs::resume_job,
        handlers::jobs::stop_job,
        handlers::signed_urls::issue_signed_urls,
        handlers::downloads::signed_download,
        handlers::ingest::ingest_scan,
        handlers::ingest::confirm_originals,
    ),
    components(schemas(
        models::StartJobRequest,
        models::StartJobResponse,
        models::JobActionRequest,
        models::JobActionResponse,
        models::SignedUrlsRequest,
        models::SignedUpload,
        models::SignedUrlsResponse,
        models::SignedDownloadRequest,
        models::SignedDownloadResponse,
        models::IngestScanRequest,
        models::IngestScanResponse,
        models::ConfirmOriginalsRequest,
        models::ConfirmOriginalsResponse,
        models::ErrorResponse,
        models::JobStatus,
        models::ImageType,
        models::ImageKind,
        models::SignedUrlMode,
        handlers::health::HealthCheckResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "jobs", description = "Scan job lifecycle"),
        (name = "storage", description = "Signed URL issuance"),
        (name = "ingest", description = "Ledger ingestion and confirmation")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
