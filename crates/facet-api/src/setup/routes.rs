//! Route configuration and setup

use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use facet_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

// Request bodies are JSON only; uploads go straight to storage.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState {
        device_api_key: config.device_api_key.clone(),
    });

    // Public routes (no authentication required)
    let public_routes = public_routes(state.clone());

    // Protected routes (require the device key)
    let protected_routes = protected_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(auth_state, auth_middleware),
    );

    let app = public_routes
        .merge(protected_routes)
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
}

/// Protected routes (require the device key).
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs/start", post(handlers::jobs::start_job))
        .route("/jobs/{job_id}/pause", post(handlers::jobs::pause_job))
        .route("/jobs/{job_id}/resume", post(handlers::jobs::resume_job))
        .route("/jobs/{job_id}/stop", post(handlers::jobs::stop_job))
        .route(
            "/storage/signed-urls",
            post(handlers::signed_urls::issue_signed_urls),
        )
        .route(
            "/storage/signed-download",
            post(handlers::downloads::signed_download),
        )
        .route("/ingest/scan", post(handlers::ingest::ingest_scan))
        .route(
            "/ingest/confirm-originals",
            post(handlers::ingest::confirm_originals),
        )
        .with_state(state)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
