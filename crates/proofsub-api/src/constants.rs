//! API constants

/// Versioned prefix for every analysis route
pub const API_PREFIX: &str = "/api/v1";

/// Fallback name for uploads whose part carries no filename
pub const DEFAULT_UPLOAD_NAME: &str = "upload";

/// Fallback name for URLs without a usable last path segment
pub const DEFAULT_REMOTE_NAME: &str = "remote-file";
