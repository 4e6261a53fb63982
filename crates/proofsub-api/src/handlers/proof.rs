use crate::error::HttpAppError;
use crate::services::{AnalysisService, MediaSource};
use crate::state::AppState;
use crate::utils::upload::read_analysis_form;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use proofsub_processing::ProofResponse;
use std::sync::Arc;

/// `POST /analyze/proof`: verify a pledge against up to two pieces of evidence.
///
/// The primary source is `file` or `publicUrl`; `file2` is an optional second upload.
/// `quantity` must be an integer when present.
#[tracing::instrument(skip(state, multipart), fields(operation = "verify_pledge"))]
pub async fn verify_proof(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProofResponse>, HttpAppError> {
    let form = read_analysis_form(multipart?, state.config.max_inline_upload_bytes()).await?;
    let params = form.verification_parameters()?;
    let primary = MediaSource::select(form.file, form.public_url)?;

    let response = AnalysisService::new(&state)
        .verify_pledge(primary, form.file2, &params)
        .await?;
    Ok(Json(response))
}
