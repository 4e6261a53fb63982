//! Error types module
//!
//! This module provides the error type shared by every stage of the request pipeline.
//! Stage-specific errors (acquisition, extraction, model gateway) are converted into
//! `AppError`, which describes how it should be presented over HTTP through `ErrorMetadata`.

use std::io;

/// Message returned when a request carries neither an upload nor a URL.
pub const MISSING_SOURCE_MESSAGE: &str = "Provide either a file or a publicUrl";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for upstream problems outside our control
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "MODEL_GATEWAY_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Metadata extraction failed: {0}")]
    Extraction(String),

    #[error("Model gateway error: {0}")]
    ModelGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn missing_source() -> Self {
        AppError::InvalidInput(MISSING_SOURCE_MESSAGE.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (413, "PAYLOAD_TOO_LARGE", false, false, LogLevel::Debug),
        AppError::UpstreamFetch(_) => (502, "UPSTREAM_FETCH_ERROR", true, false, LogLevel::Warn),
        AppError::Extraction(_) => (500, "EXTRACTION_ERROR", false, true, LogLevel::Error),
        AppError::ModelGateway(_) => (502, "MODEL_GATEWAY_ERROR", true, true, LogLevel::Warn),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::UpstreamFetch(_) => "UpstreamFetch",
            AppError::Extraction(_) => "Extraction",
            AppError::ModelGateway(_) => "ModelGateway",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = match self {
            AppError::InternalWithSource { message, .. } => format!("Internal error: {}", message),
            other => other.to_string(),
        };

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::UpstreamFetch(ref msg) => msg.clone(),
            AppError::Extraction(_) => "Failed to read media for metadata extraction".to_string(),
            AppError::ModelGateway(_) => "Analysis model request failed".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_is_plain_validation_error() {
        let err = AppError::missing_source();
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(err.client_message(), "Provide either a file or a publicUrl");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_model_gateway() {
        let err = AppError::ModelGateway("quota exhausted".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "MODEL_GATEWAY_ERROR");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Analysis model request failed");
    }

    #[test]
    fn test_error_metadata_payload_too_large() {
        let err = AppError::PayloadTooLarge("use publicUrl".to_string());
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.client_message(), "use publicUrl");
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("disk gone").context("spool write");
        let err = AppError::from(source);
        let details = err.detailed_message();
        assert!(details.contains("spool write"));
        assert!(details.contains("Caused by"));
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn test_io_error_converts_to_internal() {
        let err = AppError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.error_type(), "Internal");
        assert_eq!(err.client_message(), "Internal server error");
    }
}
