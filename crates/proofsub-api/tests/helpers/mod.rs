//! Test helpers: build AppState and router for integration tests.
//!
//! The model gateway is replaced by [`MockGateway`], which records every request and replies
//! with canned text. Remote `publicUrl` sources are served by mockito.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use proofsub_api::constants;
use proofsub_api::setup::routes;
use proofsub_api::state::AppState;
use proofsub_core::{BaseConfig, Config, GeminiConfig, IntakeConfig, ServiceConfig};
use proofsub_gateway::{AnalysisGateway, AnalysisRequest, GatewayError};
use std::sync::{Arc, Mutex};

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Unavailable,
}

/// Gateway double that records requests instead of calling a model.
pub struct MockGateway {
    reply: MockReply,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl MockGateway {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: MockReply::Text(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: MockReply::Unavailable,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn only_request(&self) -> AnalysisRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one model call");
        requests.into_iter().next().unwrap()
    }
}

#[async_trait]
impl AnalysisGateway for MockGateway {
    async fn generate(&self, request: AnalysisRequest) -> Result<String, GatewayError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Unavailable => Err(GatewayError::Status {
                status: 503,
                body: "model overloaded".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Inline uploads are capped at 1 MiB; private URL targets are allowed so mockito works.
pub fn test_config() -> Config {
    Config::from(ServiceConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            http_concurrency_limit: 64,
        },
        gemini: GeminiConfig {
            api_key: "test-key".to_string(),
            model_id: "mock-model".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            use_thinking: false,
            thinking_budget: -1,
            timeout_secs: 5,
        },
        intake: IntakeConfig {
            max_inline_upload_bytes: 1024 * 1024,
            max_remote_file_bytes: 4 * 1024 * 1024,
            remote_spool_threshold_bytes: 64 * 1024,
            url_fetch_timeout_secs: 5,
            url_fetch_allowlist: None,
            url_fetch_allow_private: true,
        },
    })
}

/// Test application: server plus the gateway double it talks to.
pub struct TestApp {
    pub server: TestServer,
    pub gateway: Arc<MockGateway>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn setup_test_app(gateway: MockGateway) -> TestApp {
    setup_test_app_with_config(test_config(), gateway)
}

pub fn setup_test_app_with_config(config: Config, gateway: MockGateway) -> TestApp {
    let gateway = Arc::new(gateway);
    let state = Arc::new(AppState::new(
        config.clone(),
        reqwest::Client::new(),
        gateway.clone(),
    ));

    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp { server, gateway }
}
