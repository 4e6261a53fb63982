//! Domain models passed between pipeline stages.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Keys that describe the container or the parser rather than the media itself.
pub const IGNORED_METADATA_KEYS: [&str; 5] = [
    "File Name",
    "File Modified Date",
    "Content Identifier",
    "X-TIKA:Parsed-By",
    "X-TIKA:Parsed-By-Full-Set",
];

pub const DEFAULT_UNITS: &str = "pieces";

/// Insertion-ordered tag name to value mapping.
pub type MetadataMap = IndexMap<String, String>;

fn is_ignored(key: &str) -> bool {
    IGNORED_METADATA_KEYS.contains(&key)
}

/// Lowercase hex SHA-256 of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn from_bytes(digest: [u8; 32]) -> Self {
        ContentDigest(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locally extracted metadata for one file.
///
/// `exif` is only populated for recognized image types. `metadata` is populated for
/// every payload. Neither map ever contains a key from [`IGNORED_METADATA_KEYS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub exif: MetadataMap,
    pub metadata: MetadataMap,
}

impl ExtractedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an EXIF tag. Returns false when the key is ignored.
    pub fn record_exif(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if is_ignored(&key) {
            return false;
        }
        self.exif.insert(key, value.into());
        true
    }

    /// Record a general metadata entry. Blank values are dropped.
    pub fn record_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if is_ignored(&key) || value.trim().is_empty() {
            return false;
        }
        self.metadata.insert(key, value);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_empty() && self.metadata.is_empty()
    }
}

/// Caller-supplied parameters for pledge verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationParameters {
    pub input_prompt: Option<String>,
    /// Expected quantity. 0 asks the model to infer it from context.
    pub quantity: i64,
    pub units: String,
}

impl Default for VerificationParameters {
    fn default() -> Self {
        Self {
            input_prompt: None,
            quantity: 0,
            units: DEFAULT_UNITS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex() {
        let digest = ContentDigest::from_bytes([0xAB; 32]);
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest.as_str().starts_with("abab"));
        assert_eq!(serde_json::to_string(&digest).unwrap(), format!("\"{}\"", digest));
    }

    #[test]
    fn ignored_keys_never_recorded() {
        let mut extracted = ExtractedMetadata::new();
        for key in IGNORED_METADATA_KEYS {
            assert!(!extracted.record_exif(key, "x"));
            assert!(!extracted.record_metadata(key, "x"));
        }
        assert!(extracted.is_empty());
    }

    #[test]
    fn blank_metadata_values_are_dropped() {
        let mut extracted = ExtractedMetadata::new();
        assert!(!extracted.record_metadata("dc:title", "   "));
        assert!(extracted.record_metadata("dc:title", "Report"));
        assert_eq!(extracted.metadata.get("dc:title").map(String::as_str), Some("Report"));
    }

    #[test]
    fn insertion_order_is_preserved_in_json() {
        let mut extracted = ExtractedMetadata::new();
        extracted.record_metadata("Content-Type", "image/png");
        extracted.record_metadata("Content-Length", "42");
        extracted.record_metadata("tiff:ImageWidth", "1");
        let json = serde_json::to_string(&extracted).unwrap();
        let ct = json.find("Content-Type").unwrap();
        let cl = json.find("Content-Length").unwrap();
        let width = json.find("tiff:ImageWidth").unwrap();
        assert!(ct < cl && cl < width);
    }

    #[test]
    fn verification_defaults() {
        let params = VerificationParameters::default();
        assert_eq!(params.quantity, 0);
        assert_eq!(params.units, "pieces");
        assert!(params.input_prompt.is_none());
    }
}
