//! Storage setup: one handle per bucket.

use anyhow::{Context, Result};
use facet_core::Config;
use facet_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn Storage>, Arc<dyn Storage>)> {
    let originals = create_storage(config, &config.originals_bucket)
        .await
        .with_context(|| format!("Failed to set up bucket '{}'", config.originals_bucket))?;
    let previews = create_storage(config, &config.previews_bucket)
        .await
        .with_context(|| format!("Failed to set up bucket '{}'", config.previews_bucket))?;

    tracing::info!(
        backend = ?config.storage_backend,
        originals_bucket = %config.originals_bucket,
        previews_bucket = %config.previews_bucket,
        "Storage initialized"
    );

    Ok((originals, previews))
}
