//! Shared HTTP client for the ingestion API.
//!
//! Used by the device tool. Errors carry the server's machine-readable
//! error code and a retryable/terminal classification, which is what the
//! offline sync engine keys its queue policy on.

pub mod api;

use anyhow::{Context, Result};
use facet_core::models::ErrorResponse;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEVICE_KEY_HEADER: &str = "X-Device-Key";

/// Client-side request failure.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Status {
        status: u16,
        /// Machine-readable code from the error body, when one was parseable.
        code: Option<String>,
        message: String,
    },
}

impl ClientError {
    /// Whether retrying the same request later can possibly succeed.
    ///
    /// Transport failures and server-side trouble are retryable; any other
    /// 4xx means the request itself is wrong and will never go through.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Transport(_) => None,
            ClientError::Status { code, .. } => code.as_deref(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport(_) => None,
            ClientError::Status { status, .. } => Some(*status),
        }
    }
}

/// HTTP client for the ingestion API, authenticated with the device key.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    device_key: String,
}

impl ApiClient {
    pub fn new(base_url: String, device_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            device_key,
        })
    }

    /// Create client from environment: FACET_API_URL and FACET_DEVICE_KEY.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("FACET_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let device_key = std::env::var("FACET_DEVICE_KEY")
            .context("Missing device key. Set FACET_DEVICE_KEY")?;

        Self::new(base_url, device_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and deserialize the JSON response. Non-success
    /// statuses become `ClientError::Status` with the body's error code.
    pub(crate) async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .header(DEVICE_KEY_HEADER, &self.device_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(err) => (Some(err.code), err.error),
            Err(_) => {
                let message = if text.is_empty() {
                    status.to_string()
                } else {
                    text
                };
                (None, message)
            }
        };

        Err(ClientError::Status {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// PUT raw bytes to a signed URL. No auth header: the signature in the
    /// URL is the credential.
    pub async fn put_signed(
        &self,
        signed_url: &str,
        data: bytes::Bytes,
        content_type: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .put(signed_url)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            code: None,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, code: Option<&str>) -> ClientError {
        ClientError::Status {
            status,
            code: code.map(String::from),
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_retry_classification() {
        assert!(status_error(500, None).is_retryable());
        assert!(status_error(502, Some("UPSTREAM_UNAVAILABLE")).is_retryable());
        assert!(status_error(429, None).is_retryable());
        assert!(status_error(408, None).is_retryable());

        assert!(!status_error(400, Some("INVALID_INPUT")).is_retryable());
        assert!(!status_error(401, Some("UNAUTHORIZED")).is_retryable());
        assert!(!status_error(409, Some("DIAMOND_EXISTS")).is_retryable());
    }

    #[test]
    fn test_error_body_code_parsing() {
        let body = r#"{"error":"diamond already exists","code":"DIAMOND_EXISTS","recoverable":false}"#;
        let parsed: facet_core::models::ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.code, "DIAMOND_EXISTS");
        assert!(!parsed.recoverable);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new(
            "http://localhost:8000/".to_string(),
            "key".to_string(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.build_url("/health"), "http://localhost:8000/health");
    }
}
