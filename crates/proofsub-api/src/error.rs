//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Stage errors convert into
//! `AppError` first, so every failure renders through the same status, body and logging path.
//! Server error details are attached to the response and only rendered by
//! `error_details_middleware` when the configured environment is not production.

use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use proofsub_core::{AppError, ErrorMetadata, LogLevel};
use proofsub_gateway::GatewayError;
use proofsub_processing::{AcquireError, ExtractionError};
use serde::Serialize;
use std::sync::Arc;

/// Error body. Client errors only carry `error`; server errors add `code`, and `details`
/// outside production.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            details: None,
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from proofsub-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<AcquireError> for HttpAppError {
    fn from(err: AcquireError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<ExtractionError> for HttpAppError {
    fn from(err: ExtractionError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<GatewayError> for HttpAppError {
    fn from(err: GatewayError) -> Self {
        HttpAppError(err.into())
    }
}

/// Requests that are not multipart at all (missing or wrong content type, no boundary).
impl From<MultipartRejection> for HttpAppError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid multipart request: {}",
            rejection.body_text()
        )))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn error_body(app_error: &AppError, include_details: bool) -> ErrorResponse {
    let mut body = ErrorResponse::new(app_error.client_message());

    if app_error.http_status_code() >= 500 {
        body.code = Some(app_error.error_code().to_string());
        if include_details {
            body.details = Some(app_error.detailed_message());
        }
    }

    body
}

/// Detailed body for a server error, kept in the response extensions.
#[derive(Debug, Clone)]
struct DetailedErrorBody(ErrorResponse);

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let mut response = (status, Json(error_body(app_error, false))).into_response();
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(DetailedErrorBody(error_body(app_error, true)));
        }
        response
    }
}

/// Render server error details unless the service runs in production.
pub async fn error_details_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(DetailedErrorBody(body)) = response.extensions_mut().remove::<DetailedErrorBody>()
    else {
        return response;
    };
    if state.config.is_production() {
        return response;
    }

    (response.status(), Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_errors_only_carry_the_message() {
        let body = error_body(&AppError::missing_source(), true);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"error": "Provide either a file or a publicUrl"})
        );
    }

    #[test]
    fn server_errors_carry_code_and_details_when_requested() {
        let err = AppError::ModelGateway("model returned HTTP 429: quota".to_string());
        let value = serde_json::to_value(error_body(&err, true)).unwrap();
        assert_eq!(value["error"], "Analysis model request failed");
        assert_eq!(value["code"], "MODEL_GATEWAY_ERROR");
        assert!(value["details"].as_str().unwrap().contains("429"));
    }

    #[test]
    fn details_omitted_by_default() {
        let err = AppError::Internal("spool file vanished".to_string());
        let value = serde_json::to_value(error_body(&err, false)).unwrap();
        assert_eq!(value, json!({"error": "Internal server error", "code": "INTERNAL_ERROR"}));
    }

    #[test]
    fn payload_too_large_maps_to_413() {
        let response = HttpAppError::from(AcquireError::TooLarge {
            limit_bytes: 20 * 1024 * 1024,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn gateway_failure_maps_to_502() {
        let response = HttpAppError::from(GatewayError::EmptyResponse).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.extensions().get::<DetailedErrorBody>().is_some());
    }

    #[test]
    fn client_errors_attach_no_details() {
        let response = HttpAppError::from(AppError::missing_source()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<DetailedErrorBody>().is_none());
    }
}
