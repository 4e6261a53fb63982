//! Multipart form parsing for the analysis endpoints.

use crate::constants::DEFAULT_UPLOAD_NAME;
use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use proofsub_core::{AppError, VerificationParameters, DEFAULT_UNITS};
use proofsub_processing::{AcquireError, AcquiredMedia, MediaIntake};

const MAX_FILENAME_LENGTH: usize = 255;

/// Fields accepted by `/analyze` and `/analyze/proof`. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct AnalysisForm {
    pub file: Option<AcquiredMedia>,
    pub file2: Option<AcquiredMedia>,
    pub public_url: Option<String>,
    pub input_prompt: Option<String>,
    pub quantity: Option<String>,
    pub units: Option<String>,
}

impl AnalysisForm {
    /// Pledge parameters with defaults applied for absent or blank fields.
    pub fn verification_parameters(&self) -> Result<VerificationParameters, AppError> {
        Ok(VerificationParameters {
            input_prompt: self.input_prompt.clone(),
            quantity: parse_quantity(self.quantity.as_deref())?,
            units: self
                .units
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(DEFAULT_UNITS)
                .to_string(),
        })
    }
}

/// Absent or blank means 0, which asks the model to infer the quantity.
pub fn parse_quantity(raw: Option<&str>) -> Result<i64, AppError> {
    match raw.map(str::trim).filter(|q| !q.is_empty()) {
        None => Ok(0),
        Some(value) => value.parse::<i64>().map_err(|_| {
            AppError::InvalidInput(format!("quantity must be an integer, got '{}'", value))
        }),
    }
}

/// Keep only the final path component, drop control characters and cap the length.
pub fn sanitize_filename(filename: &str) -> String {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let sanitized: String = filename_only
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_LENGTH)
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return DEFAULT_UPLOAD_NAME.to_string();
    }

    sanitized
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(
            "Request body exceeds the upload limit; supply large files through publicUrl instead"
                .to_string(),
        );
    }
    AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
}

/// Stream one file field into memory, hashing as it arrives. Empty parts count as absent.
async fn read_file_field(
    mut field: Field<'_>,
    max_inline_bytes: usize,
) -> Result<Option<AcquiredMedia>, AppError> {
    let file_name = sanitize_filename(field.file_name().unwrap_or_default());
    let declared_type = field.content_type().map(|s| s.to_string());

    let mut intake = MediaIntake::in_memory(max_inline_bytes);
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        intake.push(&chunk).map_err(|e| match e {
            AcquireError::TooLarge { limit_bytes } => AppError::PayloadTooLarge(format!(
                "File exceeds the {} MB inline upload limit; supply it through publicUrl instead",
                limit_bytes / 1024 / 1024
            )),
            other => other.into(),
        })?;
    }

    if intake.is_empty() {
        tracing::debug!(file_name = %file_name, "Ignoring empty file part");
        return Ok(None);
    }

    let media = intake.finish(file_name, declared_type.as_deref())?;
    tracing::info!(
        file_name = %media.file_name,
        hash = %media.digest,
        content_type = %media.content_type,
        size_bytes = media.size,
        "Received file"
    );
    Ok(Some(media))
}

async fn read_text_field(field: Field<'_>) -> Result<Option<String>, AppError> {
    let text = field.text().await.map_err(multipart_error)?;
    Ok(Some(text).filter(|t| !t.trim().is_empty()))
}

/// Parse the multipart body. Only one part per file field is accepted.
pub async fn read_analysis_form(
    mut multipart: Multipart,
    max_inline_bytes: usize,
) -> Result<AnalysisForm, AppError> {
    let mut form = AnalysisForm::default();
    let mut seen_file = false;
    let mut seen_file2 = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" | "file2" => {
                let seen = if field_name == "file" {
                    &mut seen_file
                } else {
                    &mut seen_file2
                };
                if *seen {
                    return Err(AppError::InvalidInput(format!(
                        "Multiple '{}' fields are not allowed",
                        field_name
                    )));
                }
                *seen = true;

                let media = read_file_field(field, max_inline_bytes).await?;
                if field_name == "file" {
                    form.file = media;
                } else {
                    form.file2 = media;
                }
            }
            "publicUrl" => form.public_url = read_text_field(field).await?.map(|u| u.trim().to_string()),
            "inputPrompt" => form.input_prompt = read_text_field(field).await?,
            "quantity" => form.quantity = read_text_field(field).await?,
            "units" => form.units = read_text_field(field).await?,
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_defaults_to_zero() {
        assert_eq!(parse_quantity(None).unwrap(), 0);
        assert_eq!(parse_quantity(Some("  ")).unwrap(), 0);
        assert_eq!(parse_quantity(Some(" 12 ")).unwrap(), 12);
        assert_eq!(parse_quantity(Some("-3")).unwrap(), -3);
    }

    #[test]
    fn non_integer_quantity_is_rejected() {
        for raw in ["five", "2.5", "1e3"] {
            let err = parse_quantity(Some(raw)).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{raw}");
        }
    }

    #[test]
    fn verification_defaults() {
        let form = AnalysisForm::default();
        let params = form.verification_parameters().unwrap();
        assert_eq!(params, VerificationParameters::default());

        let form = AnalysisForm {
            quantity: Some("5".to_string()),
            units: Some(" kg ".to_string()),
            input_prompt: Some("Planted saplings".to_string()),
            ..Default::default()
        };
        let params = form.verification_parameters().unwrap();
        assert_eq!(params.quantity, 5);
        assert_eq!(params.units, "kg");
        assert_eq!(params.input_prompt.as_deref(), Some("Planted saplings"));
    }

    #[test]
    fn sanitize_filename_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\IMG 0001.JPG"), "IMG 0001.JPG");
        assert_eq!(sanitize_filename("report\u{0}.pdf"), "report.pdf");
    }

    #[test]
    fn sanitize_filename_falls_back_for_empty_names() {
        assert_eq!(sanitize_filename(""), DEFAULT_UPLOAD_NAME);
        assert_eq!(sanitize_filename("dir/"), DEFAULT_UPLOAD_NAME);
        assert_eq!(sanitize_filename(".."), DEFAULT_UPLOAD_NAME);
    }

    #[test]
    fn sanitize_filename_caps_length() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LENGTH);
    }
}
