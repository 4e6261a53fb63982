//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use proofsub_core::Config;
use proofsub_gateway::GeminiGateway;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        model = %config.model_id(),
        thinking = config.gemini().use_thinking,
        "Configuration loaded and validated successfully"
    );

    // One pooled client serves both URL downloads and model calls; timeouts are per request.
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("proofsub/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let gateway = Arc::new(GeminiGateway::new(http_client.clone(), config.gemini()));
    let state = Arc::new(AppState::new(config.clone(), http_client, gateway));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
