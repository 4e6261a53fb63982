//! Proofsub model gateway
//!
//! The [`AnalysisGateway`] trait is the seam between the request pipeline and the hosted
//! model. [`GeminiGateway`] implements it against the Gemini `generateContent` API.

mod gemini;

use async_trait::async_trait;
use bytes::Bytes;
use proofsub_core::AppError;

pub use gemini::GeminiGateway;

/// Media attached to a model request.
#[derive(Debug, Clone)]
pub enum MediaPart {
    /// Payload bytes sent inline, base64 encoded on the wire.
    Inline { mime_type: String, data: Bytes },
    /// Publicly reachable file the model fetches itself.
    Uri { mime_type: String, uri: String },
}

impl MediaPart {
    pub fn mime_type(&self) -> &str {
        match self {
            MediaPart::Inline { mime_type, .. } | MediaPart::Uri { mime_type, .. } => mime_type,
        }
    }
}

/// Prompt text followed by media parts, in the order they are sent.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub prompt: String,
    pub media: Vec<MediaPart>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected model response: {0}")]
    InvalidResponse(String),

    #[error("model blocked the prompt: {0}")]
    Blocked(String),

    #[error("model returned no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::ModelGateway(err.to_string())
    }
}

/// Sends a prompt plus media to a generative model and returns its raw text.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    async fn generate(&self, request: AnalysisRequest) -> Result<String, GatewayError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
