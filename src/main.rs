mod api;
mod app;
mod config;
mod domain;
mod error;
mod estimator;
mod logging;
mod middleware;
mod repo;
mod routes;
mod services;

use anyhow::Result;
use std::sync::Arc;

use repo::{InMemoryEstimateRepository, InMemoryProjectRepository};
use services::ModelClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        model = %settings.model_name,
        "Starting RoofScope backend"
    );

    // Create model API client
    let model_client = ModelClient::new(
        &settings.model_api_url,
        &settings.model_api_key,
        &settings.model_name,
        settings.model_timeout_seconds,
    )?;

    // Optionally check model API reachability (non-blocking)
    tokio::spawn({
        let model_client = model_client.clone();
        async move {
            match model_client.health_check().await {
                Ok(()) => tracing::info!("Model API is reachable"),
                Err(e) => tracing::warn!(error = %e, "Model API probe failed - estimates will fail until it recovers"),
            }
        }
    });

    // In-memory persistence (injected behind repository traits)
    let projects = Arc::new(InMemoryProjectRepository::new());
    let estimates = Arc::new(InMemoryEstimateRepository::new());

    // Create application state
    let state = app::AppState::new(settings.clone(), model_client, projects, estimates);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
