//! Domain layer for the GlassScore evaluation core
//!
//! This module contains the evidence model, session state and the port traits
//! implemented by infrastructure adapters.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult, ProviderError};
