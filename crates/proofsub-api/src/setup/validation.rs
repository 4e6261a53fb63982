//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use proofsub_core::Config;

/// Validate critical configuration values. Structural checks live in `Config::validate`;
/// this adds the checks that only matter when serving HTTP.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();

    if is_production && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Please set specific allowed origins via CORS_ORIGINS environment variable."
        ));
    }

    if config.http_concurrency_limit() == 0 {
        return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT cannot be 0"));
    }

    if is_production && config.intake().url_fetch_allow_private {
        tracing::warn!(
            "URL_FETCH_ALLOW_PRIVATE is enabled in production - publicUrl may reach internal hosts"
        );
    }

    if config.gemini().api_base.starts_with("http://") {
        tracing::warn!(
            api_base = %config.gemini().api_base,
            "Model API base uses plain HTTP - the API key is sent unencrypted"
        );
    }

    Ok(())
}
