//! Proofsub processing pipeline
//!
//! Everything that happens to a payload locally: acquisition and hashing, content type
//! sniffing, metadata extraction, prompt assembly and normalization of the model output.

pub mod acquire;
pub mod metadata;
pub mod normalize;
pub mod prompt;
pub mod sniff;

pub use acquire::{AcquireError, AcquiredMedia, MediaBody, MediaIntake, MediaReader};
pub use metadata::{extract, extract_media, ExtractionError, IMAGE_TYPES};
pub use normalize::{
    normalize_model_output, strip_code_fences, AnalyzeResponse, ModelAnalysis, ProofResponse,
};
pub use prompt::{build_analysis_prompt, build_proof_prompt, AnalysisPrompt, PromptTemplate};
pub use sniff::{normalize_mime_type, resolve_content_type, sniff_content_type};
