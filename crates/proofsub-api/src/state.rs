//! Application state shared by every handler.

use proofsub_core::Config;
use proofsub_gateway::AnalysisGateway;
use std::sync::Arc;

/// Immutable configuration plus the two outbound collaborators: the pooled HTTP client
/// used for `publicUrl` downloads and the model gateway.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub gateway: Arc<dyn AnalysisGateway>,
}

impl AppState {
    pub fn new(config: Config, http_client: reqwest::Client, gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self {
            config,
            http_client,
            gateway,
        }
    }
}
