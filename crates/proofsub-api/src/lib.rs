//! Proofsub API Library
//!
//! This crate provides the HTTP handlers, the request pipeline service and application setup.

// Module declarations
pub mod constants;
mod handlers;
mod services;
pub mod setup;
mod telemetry;
mod utils;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
