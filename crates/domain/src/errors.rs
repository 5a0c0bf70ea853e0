//! Error types used outside the request path

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Infrastructure error for Facturo
///
/// Covers failures that never reach a caller of the API façade: loading
/// configuration, persisting credentials, building the transport. Request
/// failures are reported as [`crate::ApiError`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FacturoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for Facturo infrastructure operations
pub type Result<T> = std::result::Result<T, FacturoError>;
