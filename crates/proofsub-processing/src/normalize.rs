//! Model response normalization and response shaping.

use std::sync::LazyLock;

use proofsub_core::{ContentDigest, ExtractedMetadata};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*|\s*```\s*$").expect("valid regex")
});

/// Model output, either a JSON object or the text it could not be parsed from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelAnalysis {
    Parsed(Map<String, Value>),
    RawText(String),
}

impl ModelAnalysis {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ModelAnalysis::Parsed(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            ModelAnalysis::Parsed(map) => Value::Object(map),
            ModelAnalysis::RawText(text) => {
                let mut map = Map::new();
                map.insert("raw_output".to_string(), Value::String(text));
                Value::Object(map)
            }
        }
    }
}

impl Serialize for ModelAnalysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModelAnalysis::Parsed(map) => map.serialize(serializer),
            ModelAnalysis::RawText(text) => {
                let mut map = Map::new();
                map.insert("raw_output".to_string(), Value::String(text.clone()));
                map.serialize(serializer)
            }
        }
    }
}

/// Remove a leading and trailing markdown code fence, then trim.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_RE.replace_all(text, "").trim().to_string()
}

/// Interpret raw model text. Never fails: anything that is not a single JSON object is
/// kept as text.
pub fn normalize_model_output(raw: &str) -> ModelAnalysis {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => ModelAnalysis::Parsed(map),
        Ok(_) => ModelAnalysis::RawText(cleaned),
        Err(e) => {
            tracing::debug!(error = %e, "Model output is not valid JSON, returning raw text");
            ModelAnalysis::RawText(cleaned)
        }
    }
}

/// Body of a single-file analysis response.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub hash: ContentDigest,
    pub local_extraction: ExtractedMetadata,
    pub analysis: ModelAnalysis,
}

/// Body of a pledge verification response.
#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub analysis: ModelAnalysis,
}
