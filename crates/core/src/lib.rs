//! # Facturo Core
//!
//! Pure session logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for credential storage, token exchange and session
//!   expiry notification
//! - The session service driving single-flight token refresh
//!
//! ## Architecture Principles
//! - Only depends on `facturo-common` and `facturo-domain`
//! - No HTTP, filesystem or platform code
//! - All external dependencies via traits

pub mod session;

pub use session::ports::{CredentialStore, SessionListener, TokenRefresher};
pub use session::{RefreshState, SessionExpired, SessionService};
