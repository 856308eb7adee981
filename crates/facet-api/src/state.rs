//! Application state shared by all handlers.

use facet_core::Config;
use facet_db::{DeviceRepository, DiamondRepository, JobRepository, OrgRepository, RingRepository};
use facet_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Everything a request handler needs: config, repositories, and one storage
/// handle per bucket. Originals and previews live in separate buckets so the
/// existence oracle for originals can never be satisfied by a preview object.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub orgs: OrgRepository,
    pub devices: DeviceRepository,
    pub jobs: JobRepository,
    pub rings: RingRepository,
    pub diamonds: DiamondRepository,
    pub originals: Arc<dyn Storage>,
    pub previews: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: PgPool,
        originals: Arc<dyn Storage>,
        previews: Arc<dyn Storage>,
    ) -> Self {
        Self {
            config,
            orgs: OrgRepository::new(pool.clone()),
            devices: DeviceRepository::new(pool.clone()),
            jobs: JobRepository::new(pool.clone()),
            rings: RingRepository::new(pool.clone()),
            diamonds: DiamondRepository::new(pool.clone()),
            pool,
            originals,
            previews,
        }
    }

    /// Storage handle for a bucket named in a request.
    pub fn storage_for_bucket(&self, bucket: &str) -> Option<&Arc<dyn Storage>> {
        if bucket == self.config.originals_bucket {
            Some(&self.originals)
        } else if bucket == self.config.previews_bucket {
            Some(&self.previews)
        } else {
            None
        }
    }
}
