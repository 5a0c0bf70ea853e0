//! # Facturo Infrastructure
//!
//! Infrastructure implementations of core session ports and the HTTP API
//! client built on them.
//!
//! This crate contains:
//! - The HTTP transport (reqwest) with opt-in transport retry
//! - The API client façade, request pipeline and refresh endpoint client
//! - Keychain-backed and in-memory credential stores
//! - Session-expired listeners
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `facturo-core`
//! - Contains all "impure" code (network, keychain, filesystem, environment)

pub mod api;
pub mod config;
pub mod http;
pub mod session;
pub mod storage;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, HttpTokenRefresher, RequestOptions};
pub use http::{HttpClient, HttpClientBuilder};
pub use session::{ChannelSessionListener, LoggingSessionListener};
pub use storage::{KeychainCredentialStore, MemoryCredentialStore};
