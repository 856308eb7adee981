//! Configuration module
//!
//! Configuration is read from the environment exactly once at process start
//! (`Config::from_env`), validated, and passed into constructors. Nothing
//! else in the system reads environment variables ad hoc.

use std::env;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_UPLOAD_URL_TTL_SECS: u64 = 900;
const DEFAULT_ORIGINALS_BUCKET: &str = "diamond-images";
const DEFAULT_PREVIEWS_BUCKET: &str = "diamond-previews";

/// Which object-storage backend serves a deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s3" => Some(StorageBackend::S3),
            "local" => Some(StorageBackend::Local),
            _ => None,
        }
    }
}

/// Application configuration for the ingestion API.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Shared secret expected in the X-Device-Key header on every call.
    pub device_api_key: String,
    pub storage_backend: StorageBackend,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    pub s3_endpoint: Option<String>,
    pub originals_bucket: String,
    pub previews_bucket: String,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Lifetime of signed upload URLs handed to devices.
    pub upload_url_ttl_seconds: u64,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend_raw =
            env::var("STORAGE_BACKEND").unwrap_or_else(|_| "s3".to_string());
        let storage_backend = StorageBackend::parse(&storage_backend_raw).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid STORAGE_BACKEND '{}': expected 's3' or 'local'",
                storage_backend_raw
            )
        })?;

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            device_api_key: env::var("DEVICE_API_KEY").unwrap_or_default(),
            storage_backend,
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            originals_bucket: env::var("ORIGINALS_BUCKET")
                .unwrap_or_else(|_| DEFAULT_ORIGINALS_BUCKET.to_string()),
            previews_bucket: env::var("PREVIEWS_BUCKET")
                .unwrap_or_else(|_| DEFAULT_PREVIEWS_BUCKET.to_string()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
            upload_url_ttl_seconds: env::var("UPLOAD_URL_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_UPLOAD_URL_TTL_SECS),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        Ok(config)
    }

    /// Fail fast on misconfiguration. Called once during startup.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.device_api_key.is_empty() {
            anyhow::bail!("DEVICE_API_KEY is not set");
        }
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is not set");
        }
        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            anyhow::bail!("LOCAL_STORAGE_PATH is required when STORAGE_BACKEND=local");
        }
        if self.originals_bucket == self.previews_bucket {
            anyhow::bail!("ORIGINALS_BUCKET and PREVIEWS_BUCKET must differ");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 8000,
            database_url: "postgres://localhost/facet".to_string(),
            device_api_key: "secret".to_string(),
            storage_backend: StorageBackend::S3,
            s3_region: Some("us-east-1".to_string()),
            s3_endpoint: None,
            originals_bucket: "diamond-images".to_string(),
            previews_bucket: "diamond-previews".to_string(),
            local_storage_path: None,
            local_storage_base_url: None,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 20,
            db_timeout_seconds: 30,
            upload_url_ttl_seconds: 900,
            environment: "development".to_string(),
        }
    }

    #[test]
    fn test_validate_requires_device_key() {
        let mut config = base_config();
        config.device_api_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shared_bucket() {
        let mut config = base_config();
        config.previews_bucket = config.originals_bucket.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_backend_requires_path() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Local;
        assert!(config.validate().is_err());
        config.local_storage_path = Some("/tmp/facet".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(StorageBackend::parse("S3"), Some(StorageBackend::S3));
        assert_eq!(StorageBackend::parse("local"), Some(StorageBackend::Local));
        assert_eq!(StorageBackend::parse("gcs"), None);
    }
}
