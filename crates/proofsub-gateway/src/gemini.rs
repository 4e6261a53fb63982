//! Gemini `generateContent` client

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use proofsub_core::GeminiConfig;
use serde::{Deserialize, Serialize};

use crate::{AnalysisGateway, AnalysisRequest, GatewayError, MediaPart};

pub struct GeminiGateway {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    thinking_budget: i32,
    timeout: Duration,
}

impl Debug for GeminiGateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiGateway")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiGateway {
    pub fn new(http_client: reqwest::Client, config: &GeminiConfig) -> Self {
        Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            thinking_budget: if config.use_thinking {
                config.thinking_budget
            } else {
                0
            },
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_body<'a>(&self, request: &'a AnalysisRequest) -> GenerateContentRequest<'a> {
        let mut parts = Vec::with_capacity(request.media.len() + 1);
        parts.push(RequestPart::Text {
            text: &request.prompt,
        });

        for media in &request.media {
            parts.push(match media {
                MediaPart::Inline { mime_type, data } => RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: base64::engine::general_purpose::STANDARD.encode(data),
                    },
                },
                MediaPart::Uri { mime_type, uri } => RequestPart::FileData {
                    file_data: FileData {
                        mime_type,
                        file_uri: uri,
                    },
                },
            });
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                },
            },
        }
    }
}

/// Concatenated answer text of the first candidate, skipping thought summaries.
fn response_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(GatewayError::Blocked(reason)),
            None => Err(GatewayError::EmptyResponse),
        };
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        tracing::warn!(
            finish_reason = ?candidate.finish_reason,
            "Model candidate carried no text"
        );
        return Err(GatewayError::EmptyResponse);
    }

    Ok(text)
}

#[async_trait]
impl AnalysisGateway for GeminiGateway {
    async fn generate(&self, request: AnalysisRequest) -> Result<String, GatewayError> {
        let body = self.build_body(&request);

        tracing::info!(
            model = %self.model,
            media_parts = request.media.len(),
            prompt_chars = request.prompt.len(),
            thinking_budget = self.thinking_budget,
            "Sending generateContent request"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let text = response_text(parsed)?;
        tracing::debug!(model = %self.model, raw_output = %text, "Model returned output");

        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
