use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tourism_predict::api::handlers::AppState;
use tourism_predict::config::Config;
use tourism_predict::core::predictor::Predictor;
use tourism_predict::integrations::{hub_client::HubClient, model_loader::ModelLoader};

/// Main entry point for the prediction server.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Model download, verification and loading (fatal on failure).
/// - HTTP routes and middleware (CORS, Rate Limiting, Body Limit).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourism_predict=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load the model once; every request shares this instance
    let hub = HubClient::new(config.hub_endpoint.clone(), config.hub_token.clone())?;
    let loader = ModelLoader::new(
        hub,
        config.model_cache_dir.clone(),
        config.model_sha256.clone(),
    );
    let model_source = config.model_source();
    let pipeline = loader.load(&model_source).await.map_err(|e| {
        tracing::error!("Cannot start without a model: {}", e);
        e
    })?;
    tracing::info!("✓ Model ready: {}", model_source);

    // Build application state
    let app_state = Arc::new(AppState {
        predictor: Predictor::new(pipeline),
        model_source,
    });

    let app = tourism_predict::app(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
