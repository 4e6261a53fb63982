use crate::error::HttpAppError;
use crate::services::{AnalysisService, MediaSource};
use crate::state::AppState;
use crate::utils::upload::read_analysis_form;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use proofsub_processing::AnalyzeResponse;
use std::sync::Arc;

/// `POST /analyze`: forensic analysis of one file, uploaded or referenced by `publicUrl`.
#[tracing::instrument(skip(state, multipart), fields(operation = "analyze"))]
pub async fn analyze_media(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, HttpAppError> {
    let form = read_analysis_form(multipart?, state.config.max_inline_upload_bytes()).await?;
    let source = MediaSource::select(form.file, form.public_url)?;

    let response = AnalysisService::new(&state).analyze(source).await?;
    Ok(Json(response))
}
