//! Content type resolution

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Bytes of leading payload kept for magic-number detection.
pub const SNIFF_SAMPLE_LEN: usize = 8 * 1024;

/// Normalize MIME type by stripping parameters (e.g. "text/plain; charset=utf-8" -> "text/plain").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Detect a MIME type from the leading bytes, falling back to the file extension.
pub fn sniff_content_type(sample: &[u8], file_name: &str) -> String {
    if let Some(kind) = infer::get(sample) {
        return kind.mime_type().to_string();
    }

    if let Some(guess) = mime_guess::from_path(Path::new(file_name)).first() {
        return guess.essence_str().to_string();
    }

    OCTET_STREAM.to_string()
}

/// Pick the content type for a payload: a declared type wins, otherwise sniff.
/// A declared `application/octet-stream` says nothing about the payload and is sniffed too.
pub fn resolve_content_type(declared: Option<&str>, sample: &[u8], file_name: &str) -> String {
    match declared.map(normalize_mime_type) {
        Some(declared) if !declared.is_empty() && declared != OCTET_STREAM => declared,
        _ => sniff_content_type(sample, file_name),
    }
}
