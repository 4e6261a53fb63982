//! Local metadata extraction
//!
//! Two passes run over the same rewindable payload: an EXIF pass for recognized image
//! types and a general pass for every payload. Corrupt or unsupported content simply
//! yields no entries; only failures of the underlying reader are reported.

mod document;
mod exif_tags;

use std::io::{self, BufRead, Seek, SeekFrom};

use proofsub_core::{AppError, ExtractedMetadata};

use crate::acquire::AcquiredMedia;

/// Content types that get the EXIF pass.
pub const IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/tiff", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read payload: {0}")]
    Io(#[from] io::Error),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        AppError::Extraction(err.to_string())
    }
}

pub fn is_exif_candidate(content_type: &str) -> bool {
    IMAGE_TYPES.contains(&content_type)
}

/// Run both extraction passes over `reader`.
pub fn extract<R: BufRead + Seek>(
    reader: &mut R,
    content_type: &str,
    size: u64,
) -> Result<ExtractedMetadata, ExtractionError> {
    let mut extracted = ExtractedMetadata::new();

    if is_exif_candidate(content_type) {
        reader.seek(SeekFrom::Start(0))?;
        exif_tags::read_image_tags(reader, &mut extracted)?;
    }

    reader.seek(SeekFrom::Start(0))?;
    document::read_general(reader, content_type, size, &mut extracted)?;

    Ok(extracted)
}

/// Extract metadata from an acquired payload.
pub fn extract_media(media: &AcquiredMedia) -> Result<ExtractedMetadata, ExtractionError> {
    let mut reader = media.body.open()?;
    let extracted = extract(&mut reader, &media.content_type, media.size)?;

    tracing::debug!(
        file_name = %media.file_name,
        content_type = %media.content_type,
        exif_entries = extracted.exif.len(),
        metadata_entries = extracted.metadata.len(),
        "Extracted local metadata"
    );

    Ok(extracted)
}
