//! Tourism Package Prediction Service Library
//!
//! This library provides the core functionality for the tourism package
//! prediction service: the customer record schema, the pipeline artifact
//! and its loader, the prediction invoker, the HTTP handlers, and the
//! publisher that uploads a deployment folder to the model hub.
//!
//! # Modules
//!
//! - `api`: API-layer namespace (handlers, OpenAPI document).
//! - `core`: Domain-layer namespace (records, predictor, errors).
//! - `integrations`: External service integrations (model hub).
//! - `api_doc`: OpenAPI document and Swagger UI page.
//! - `artifact_validator`: SHA-256 integrity checks for downloaded artifacts.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `hub_client`: Model hub download and commit client.
//! - `model_loader`: Fetch-once pipeline cache.
//! - `models`: Customer record, field domains, prediction payloads.
//! - `pipeline`: Pipeline artifact format and evaluation.
//! - `predictor`: Prediction invoker and decision rule.
//! - `publisher`: Folder upload to a hub repository.
//! - `views`: Server-rendered form pages.

pub mod api;
pub mod core;
pub mod integrations;

pub mod api_doc;
pub mod artifact_validator;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod hub_client;
pub mod model_loader;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod publisher;
pub mod views;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::submit_form))
        .route("/api/v1/predict", post(handlers::predict_json))
        .route("/api/v1/schema", get(handlers::schema))
        .route("/docs", get(api_doc::serve_swagger_ui))
        .route("/api-docs/openapi.json", get(api_doc::serve_openapi_spec))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Routes without rate limiting, tracing or CORS.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes())
        .with_state(state)
}

/// Full application: routes plus rate limiting, tracing and CORS.
///
/// Must be served with connect info so the limiter can fall back to the peer address.
pub fn app(state: Arc<AppState>) -> anyhow::Result<Router> {
    // One token every 50ms (20 requests/second) per IP, burst of 40
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(50)
            .burst_size(40)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    // Evict stale per-IP limiter entries in the background.
    let limiter = governor_conf.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.retain_recent();
        }
    });

    // Health check bypasses rate limiting
    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes().layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        })))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
