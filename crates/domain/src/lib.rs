//! # Facturo Domain
//!
//! Data types shared by every layer of the Facturo API client.
//!
//! This crate contains:
//! - The classified error taxonomy and its classifier
//! - Credential pair and token payloads
//! - Response envelope unwrapping
//! - Configuration structures and wire constants
//!
//! ## Architecture
//! - No dependencies on other Facturo crates
//! - No I/O

pub mod api_error;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod envelope;
pub mod errors;

// Re-export commonly used items
pub use api_error::{classify, ApiError, ApiErrorKind, Presentation, TransportFailure};
pub use config::*;
pub use credentials::*;
pub use envelope::unwrap_envelope;
pub use errors::*;
