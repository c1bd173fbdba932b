//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{JsonFileStorage, OpenAiGatewayFactory},
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Snapshot Storage ---
    info!("Opening data directory {}", config.data_dir.display());
    let storage = Arc::new(JsonFileStorage::open(&config.data_dir)?);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::open(
        config.clone(),
        storage,
        Arc::new(OpenAiGatewayFactory),
    )?);
    info!("Stores loaded.");

    // --- 4. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
