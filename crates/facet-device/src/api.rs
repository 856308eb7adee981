//! API seam for the sync engine.
//!
//! The engine talks to the server through this trait so tests can drive it
//! with a scripted fake instead of a live endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use facet_api_client::{ApiClient, ClientError};
use facet_core::models::{
    ConfirmOriginalsRequest, ConfirmOriginalsResponse, IngestScanRequest, IngestScanResponse,
    SignedUrlsRequest, SignedUrlsResponse, StartJobRequest, StartJobResponse,
};

#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn start_job(&self, request: &StartJobRequest) -> Result<StartJobResponse, ClientError>;

    async fn signed_urls(
        &self,
        request: &SignedUrlsRequest,
    ) -> Result<SignedUrlsResponse, ClientError>;

    async fn ingest_scan(
        &self,
        request: &IngestScanRequest,
    ) -> Result<IngestScanResponse, ClientError>;

    async fn confirm_originals(
        &self,
        request: &ConfirmOriginalsRequest,
    ) -> Result<ConfirmOriginalsResponse, ClientError>;

    /// PUT bytes to a signed URL.
    async fn upload(
        &self,
        signed_url: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ClientError>;
}

#[async_trait]
impl DeviceApi for ApiClient {
    async fn start_job(&self, request: &StartJobRequest) -> Result<StartJobResponse, ClientError> {
        ApiClient::start_job(self, request).await
    }

    async fn signed_urls(
        &self,
        request: &SignedUrlsRequest,
    ) -> Result<SignedUrlsResponse, ClientError> {
        ApiClient::signed_urls(self, request).await
    }

    async fn ingest_scan(
        &self,
        request: &IngestScanRequest,
    ) -> Result<IngestScanResponse, ClientError> {
        ApiClient::ingest_scan(self, request).await
    }

    async fn confirm_originals(
        &self,
        request: &ConfirmOriginalsRequest,
    ) -> Result<ConfirmOriginalsResponse, ClientError> {
        ApiClient::confirm_originals(self, request).await
    }

    async fn upload(
        &self,
        signed_url: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ClientError> {
        self.put_signed(signed_url, data, content_type).await
    }
}
