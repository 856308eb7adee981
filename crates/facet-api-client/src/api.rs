//! Domain methods for the ingestion API client.
//!
//! Request/response types come from `facet_core::models`, the same types
//! the server handlers use.

use crate::{ApiClient, ClientError};
use facet_core::models::{
    ConfirmOriginalsRequest, ConfirmOriginalsResponse, IngestScanRequest, IngestScanResponse,
    JobActionRequest, JobActionResponse, SignedDownloadRequest, SignedDownloadResponse,
    SignedUrlsRequest, SignedUrlsResponse, StartJobRequest, StartJobResponse,
};
use uuid::Uuid;

impl ApiClient {
    pub async fn start_job(
        &self,
        request: &StartJobRequest,
    ) -> Result<StartJobResponse, ClientError> {
        self.post_json("/jobs/start", request).await
    }

    pub async fn pause_job(
        &self,
        job_id: Uuid,
        org_slug: &str,
    ) -> Result<JobActionResponse, ClientError> {
        self.job_action(job_id, "pause", org_slug).await
    }

    pub async fn resume_job(
        &self,
        job_id: Uuid,
        org_slug: &str,
    ) -> Result<JobActionResponse, ClientError> {
        self.job_action(job_id, "resume", org_slug).await
    }

    pub async fn stop_job(
        &self,
        job_id: Uuid,
        org_slug: &str,
    ) -> Result<JobActionResponse, ClientError> {
        self.job_action(job_id, "stop", org_slug).await
    }

    async fn job_action(
        &self,
        job_id: Uuid,
        action: &str,
        org_slug: &str,
    ) -> Result<JobActionResponse, ClientError> {
        let request = JobActionRequest {
            org_slug: org_slug.to_string(),
        };
        self.post_json(&format!("/jobs/{}/{}", job_id, action), &request)
            .await
    }

    pub async fn signed_urls(
        &self,
        request: &SignedUrlsRequest,
    ) -> Result<SignedUrlsResponse, ClientError> {
        self.post_json("/storage/signed-urls", request).await
    }

    pub async fn signed_download(
        &self,
        request: &SignedDownloadRequest,
    ) -> Result<SignedDownloadResponse, ClientError> {
        self.post_json("/storage/signed-download", request).await
    }

    pub async fn ingest_scan(
        &self,
        request: &IngestScanRequest,
    ) -> Result<IngestScanResponse, ClientError> {
        self.post_json("/ingest/scan", request).await
    }

    pub async fn confirm_originals(
        &self,
        request: &ConfirmOriginalsRequest,
    ) -> Result<ConfirmOriginalsResponse, ClientError> {
        self.post_json("/ingest/confirm-originals", request).await
    }
}
