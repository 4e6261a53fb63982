//! Request pipeline
//!
//! acquire → extract → build prompt → call model → normalize. Each request runs the stages
//! strictly in order and shares nothing with other requests beyond the application state.

use crate::state::AppState;
use crate::utils::fetch::fetch_remote_media;
use chrono::{DateTime, Utc};
use proofsub_core::{AppError, ExtractedMetadata, VerificationParameters};
use proofsub_gateway::{AnalysisRequest, MediaPart};
use proofsub_processing::{
    build_analysis_prompt, build_proof_prompt, extract_media, normalize_model_output,
    AcquiredMedia, AnalysisPrompt, AnalyzeResponse, ModelAnalysis, ProofResponse,
};

/// Where the payload of a request comes from.
#[derive(Debug)]
pub enum MediaSource {
    /// Already received and hashed; sent to the model inline.
    Upload(AcquiredMedia),
    /// Downloaded for hashing and extraction; the model fetches it by URI.
    Remote(String),
}

impl MediaSource {
    /// The upload wins when both are present.
    pub fn select(upload: Option<AcquiredMedia>, public_url: Option<String>) -> Result<Self, AppError> {
        match (upload, public_url) {
            (Some(media), url) => {
                if url.is_some() {
                    tracing::debug!(file_name = %media.file_name, "Both file and publicUrl sent, using the file");
                }
                Ok(MediaSource::Upload(media))
            }
            (None, Some(url)) => Ok(MediaSource::Remote(url)),
            (None, None) => Err(AppError::missing_source()),
        }
    }
}

pub struct AnalysisService<'a> {
    state: &'a AppState,
}

impl<'a> AnalysisService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Single-file forensic analysis.
    pub async fn analyze(&self, source: MediaSource) -> Result<AnalyzeResponse, AppError> {
        let now = Utc::now();

        let (media, part) = self.resolve(source).await?;
        let (media, extracted) = extract_off_thread(media).await?;

        let prompt = build_analysis_prompt(&extracted, now)?;
        let analysis = self.call_model(prompt, vec![part]).await?;

        tracing::info!(
            file_name = %media.file_name,
            hash = %media.digest,
            parsed = analysis.is_parsed(),
            "Analysis completed"
        );

        Ok(AnalyzeResponse {
            file_name: media.file_name,
            hash: media.digest,
            local_extraction: extracted,
            analysis,
        })
    }

    /// Pledge verification over the primary source and an optional second upload.
    pub async fn verify_pledge(
        &self,
        primary: MediaSource,
        secondary: Option<AcquiredMedia>,
        params: &VerificationParameters,
    ) -> Result<ProofResponse, AppError> {
        let now: DateTime<Utc> = Utc::now();

        let mut sources = vec![self.resolve(primary).await?];
        if let Some(media) = secondary {
            sources.push(self.resolve(MediaSource::Upload(media)).await?);
        }

        let mut extracted = Vec::with_capacity(sources.len());
        let mut parts = Vec::with_capacity(sources.len());
        for (media, part) in sources {
            let (media, metadata) = extract_off_thread(media).await?;
            tracing::debug!(file_name = %media.file_name, hash = %media.digest, "Prepared pledge evidence");
            extracted.push(metadata);
            parts.push(part);
        }

        let prompt = build_proof_prompt(&extracted, params, now)?;
        let analysis = self.call_model(prompt, parts).await?;

        tracing::info!(
            files = extracted.len(),
            quantity = params.quantity,
            units = %params.units,
            parsed = analysis.is_parsed(),
            "Pledge verification completed"
        );

        Ok(ProofResponse { analysis })
    }

    /// Turn a source into acquired bytes plus the media part the model will receive.
    async fn resolve(&self, source: MediaSource) -> Result<(AcquiredMedia, MediaPart), AppError> {
        match source {
            MediaSource::Upload(media) => {
                let part = MediaPart::Inline {
                    mime_type: media.content_type.clone(),
                    data: media.body.to_bytes()?,
                };
                Ok((media, part))
            }
            MediaSource::Remote(url) => {
                let media =
                    fetch_remote_media(&self.state.http_client, &url, self.state.config.intake())
                        .await?;
                let part = MediaPart::Uri {
                    mime_type: media.content_type.clone(),
                    uri: url,
                };
                Ok((media, part))
            }
        }
    }

    async fn call_model(
        &self,
        prompt: AnalysisPrompt,
        media: Vec<MediaPart>,
    ) -> Result<ModelAnalysis, AppError> {
        let gateway = &self.state.gateway;
        tracing::debug!(
            model = %gateway.model(),
            template = ?prompt.template,
            generated_at = %prompt.timestamp(),
            media_parts = media.len(),
            "Calling analysis model"
        );

        let raw = gateway
            .generate(AnalysisRequest {
                prompt: prompt.into_text(),
                media,
            })
            .await?;

        Ok(normalize_model_output(&raw))
    }
}

/// Run both extraction passes on the blocking pool.
async fn extract_off_thread(
    media: AcquiredMedia,
) -> Result<(AcquiredMedia, ExtractedMetadata), AppError> {
    let (media, result) = run_blocking(move || {
        let result = extract_media(&media);
        (media, result)
    })
    .await?;

    Ok((media, result?))
}

/// A panic inside `work` becomes an internal error for this request only.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Metadata extraction task failed: {}", e)))
}
