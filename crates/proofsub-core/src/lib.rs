//! Proofsub Core Library
//!
//! This crate provides the domain models, error types and configuration shared by the
//! processing pipeline, the model gateway and the HTTP API.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{parse_thinking_flag, BaseConfig, Config, GeminiConfig, IntakeConfig, ServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel, MISSING_SOURCE_MESSAGE};
pub use models::{
    ContentDigest, ExtractedMetadata, MetadataMap, VerificationParameters, DEFAULT_UNITS,
    IGNORED_METADATA_KEYS,
};
