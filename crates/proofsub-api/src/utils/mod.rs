pub mod fetch;
pub mod ssrf_validation;
pub mod upload;
