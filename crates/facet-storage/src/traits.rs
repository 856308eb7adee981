//! Storage abstraction trait
//!
//! All storage backends (S3, local filesystem) must implement this trait.
//! Keys are bucket-relative canonical paths produced by
//! `facet_core::paths::object_path`; backends never invent their own keys.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// One instance is bound to one bucket.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an object directly (server-side writes: seeding, dev tooling).
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Mint a time-limited signed PUT URL for a direct device upload.
    /// Only supported by S3 backends; others return a `ConfigError`.
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Mint a time-limited signed GET URL for direct object access.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// The existence oracle: authoritative "does this object exist".
    ///
    /// Returns `Ok(false)` only on a definitive not-found from the backend.
    /// Any other failure is a `BackendError` so callers never mistake a
    /// transient outage for a missing object. Read-only and safe to retry.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
