//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use facet_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    tracing::info!("Configuration loaded and validated successfully");

    // Setup database
    let pool = database::setup_database(&config).await?;

    // Setup storage (one handle per bucket)
    let (originals, previews) = storage::setup_storage(&config).await?;

    let state = Arc::new(AppState::new(config.clone(), pool, originals, previews));

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
