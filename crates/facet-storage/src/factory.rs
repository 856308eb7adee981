use crate::{LocalStorage, S3Storage, Storage, StorageBackend, StorageError, StorageResult};
use facet_core::Config;
use std::sync::Arc;

/// Create a storage handle for one bucket based on configuration.
///
/// Called twice at startup: once for the originals bucket, once for the
/// previews bucket. Local deployments nest each bucket under
/// `LOCAL_STORAGE_PATH/{bucket}`.
pub async fn create_storage(config: &Config, bucket: &str) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let storage = S3Storage::new(
                bucket.to_string(),
                config.s3_region.clone(),
                config.s3_endpoint.clone(),
            )?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Local => {
            let base_path = config.local_storage_path.as_deref().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config
                .local_storage_base_url
                .clone()
                .unwrap_or_else(|| format!("http://localhost:{}/files", config.server_port));

            let storage = LocalStorage::new(
                std::path::Path::new(base_path).join(bucket),
                format!("{}/{}", base_url.trim_end_matches('/'), bucket),
            )
            .await?;
            Ok(Arc::new(storage))
        }
    }
}
