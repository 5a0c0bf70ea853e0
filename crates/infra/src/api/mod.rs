//! Facturo API client
//!
//! The façade callers use (`get`/`post`/`put`/`patch`/`delete`), the request
//! pipeline behind it, and the refresh endpoint client the session service
//! drives.
//!
//! # Architecture
//!
//! - Uses [`crate::http::HttpClient`] for transport (no direct reqwest calls
//!   from callers)
//! - Single-flight token refresh through `facturo_core::SessionService`
//! - Idempotency keys fixed per logical call, reused on every replay

pub mod auth;
pub mod client;
pub mod errors;
pub mod refresher;
pub mod request;

pub use client::{ApiClient, ApiClientBuilder};
pub use refresher::HttpTokenRefresher;
pub use request::{AuthPolicy, FileUpload, RequestBody, RequestDescriptor, RequestOptions};
