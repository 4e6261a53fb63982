//! Streaming download of `publicUrl` sources.

use crate::constants::DEFAULT_REMOTE_NAME;
use crate::utils::ssrf_validation::UrlPolicy;
use futures::StreamExt;
use proofsub_core::{AppError, IntakeConfig};
use proofsub_processing::{AcquiredMedia, MediaIntake};
use std::time::Duration;

/// Last non-empty path segment of the URL, or a fixed fallback.
pub fn file_name_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_REMOTE_NAME.to_string())
}

/// Validate, download and acquire a remote payload. The body is hashed while it streams
/// in and spooled to a temporary file past the configured threshold.
#[tracing::instrument(skip(client, intake))]
pub async fn fetch_remote_media(
    client: &reqwest::Client,
    url: &str,
    intake: &IntakeConfig,
) -> Result<AcquiredMedia, AppError> {
    let parsed_url = UrlPolicy::from_intake(intake)
        .check(url)
        .await
        .map_err(|e| {
            if e.is_malformed() {
                tracing::warn!(url = %url, error = %e, "Unusable publicUrl");
                return AppError::UpstreamFetch(format!("Invalid URL: {}", e));
            }
            tracing::warn!(url = %url, error = %e, "SSRF validation failed");
            AppError::InvalidInput(format!("URL validation failed: {}", e))
        })?;

    let response = client
        .get(parsed_url.clone())
        .timeout(Duration::from_secs(intake.url_fetch_timeout_secs))
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, url = %url, "Failed to download from URL");
            AppError::UpstreamFetch(format!("Failed to download from URL: {}", e))
        })?;

    if !response.status().is_success() {
        return Err(AppError::UpstreamFetch(format!(
            "URL returned status code: {}",
            response.status()
        )));
    }

    let max_bytes = intake.max_remote_file_bytes;
    if let Some(declared_len) = response.content_length() {
        if declared_len > max_bytes as u64 {
            return Err(AppError::PayloadTooLarge(format!(
                "Remote file size exceeds maximum allowed size of {} MB",
                max_bytes / 1024 / 1024
            )));
        }
    }

    let declared_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let file_name = file_name_from_url(&parsed_url);
    let mut media = MediaIntake::spooling(max_bytes, intake.remote_spool_threshold_bytes);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            AppError::UpstreamFetch(format!("Failed to read response body: {}", e))
        })?;
        media.push(&chunk)?;
    }

    let acquired = media.finish(file_name, declared_type.as_deref())?;

    tracing::info!(
        file_name = %acquired.file_name,
        hash = %acquired.digest,
        content_type = %acquired.content_type,
        size_bytes = acquired.size,
        spooled = acquired.body.is_spooled(),
        "Downloaded remote media"
    );

    Ok(acquired)
}
