pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{models::ModelManager, utils::error::DetectError, Config, Result};
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: ModelManager,
}

impl AppState {
    /// State backed by the ONNX model named in `config`. Nothing is loaded
    /// until the first detection request.
    pub fn new(config: Config) -> Self {
        let models = ModelManager::onnx(config.clone());
        Self::with_models(config, models)
    }

    pub fn with_models(config: Config, models: ModelManager) -> Self {
        Self {
            config: Arc::new(config),
            models,
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    let addr = config.bind_addr;
    tracing::info!("Model path: {}", config.model_path.display());

    let app = create_app(AppState::new(config));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| DetectError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("  POST /detect - JSON data-URL image");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DetectError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.server_config.max_request_size;

    Router::new()
        .route("/detect", post(handlers::detect_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the server simply runs until killed.
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Received shutdown signal");
}
