//! Shared fixtures for handler tests: an in-memory storage double and a
//! ready-made `AppState` over a test database pool.

use crate::state::AppState;
use async_trait::async_trait;
use bytes::Bytes;
use facet_core::models::IngestScanRequest;
use facet_core::paths::SlotPaths;
use facet_core::{Config, StorageBackend};
use facet_db::{JobRow, OrgRow};
use facet_storage::{Storage, StorageResult};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Storage double whose existence oracle answers from a seeded key set.
pub struct KeySetStorage {
    keys: Mutex<HashSet<String>>,
}

impl KeySetStorage {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(HashSet::new()),
        })
    }

    /// Make the oracle report `key` as present, as if a signed PUT landed.
    pub fn insert(&self, key: &str) {
        self.keys.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl Storage for KeySetStorage {
    async fn put(&self, storage_key: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
        self.insert(storage_key);
        Ok(())
    }

    async fn presigned_put_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!("https://signed.test/put/{}", storage_key))
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!("https://signed.test/get/{}", storage_key))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.keys.lock().unwrap().contains(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

fn test_config() -> Config {
    Config {
        server_port: 8000,
        database_url: String::new(),
        device_api_key: "test-device-key".to_string(),
        storage_backend: StorageBackend::Local,
        s3_region: None,
        s3_endpoint: None,
        originals_bucket: "diamond-images".to_string(),
        previews_bucket: "diamond-previews".to_string(),
        local_storage_path: Some("/tmp/facet-test".to_string()),
        local_storage_base_url: None,
        cors_origins: vec!["*".to_string()],
        db_max_connections: 5,
        db_timeout_seconds: 30,
        upload_url_ttl_seconds: 900,
        environment: "test".to_string(),
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub originals: Arc<KeySetStorage>,
}

pub fn test_app(pool: PgPool) -> TestApp {
    let originals = KeySetStorage::empty();
    let previews = KeySetStorage::empty();
    let state = Arc::new(AppState::new(
        test_config(),
        pool,
        originals.clone(),
        previews,
    ));
    TestApp { state, originals }
}

pub async fn seed_org_and_job(state: &AppState, slug: &str) -> (OrgRow, JobRow) {
    let org = state.orgs.create(slug, slug).await.unwrap();
    let job = state.jobs.create(org.id, None, None, None).await.unwrap();
    (org, job)
}

/// Ingest request with the canonical paths for one fully captured slot.
pub fn slot_ingest_request(
    org_slug: &str,
    job_id: Uuid,
    ring_label: &str,
    slot_index: i32,
) -> IngestScanRequest {
    let paths = SlotPaths::for_slot(org_slug, job_id, ring_label, slot_index);
    IngestScanRequest {
        org_slug: org_slug.to_string(),
        job_id,
        ring_label: ring_label.to_string(),
        slot_index,
        device_name: Some("rig-1".to_string()),
        uv_free_path: paths.uv_free,
        aset_path: paths.aset,
        uv_free_preview_path: Some(paths.uv_free_thumb),
        aset_preview_path: Some(paths.aset_thumb),
    }
}
