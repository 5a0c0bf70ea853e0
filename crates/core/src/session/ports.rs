//! Port interfaces for session management
//!
//! These traits define the boundaries between the refresh protocol and the
//! infrastructure that persists credentials, talks to the refresh endpoint
//! and surfaces the re-authentication side effect.

use async_trait::async_trait;
use facturo_domain::{ApiError, CredentialPair, Result, TokenBundle};

/// Durable holder of the current credential pair
///
/// Reads and writes are synchronous so the request pipeline can decide,
/// without suspending, whether a credential exists. Implementations keep the
/// pair in memory and write through to durable storage; a failed write still
/// updates the in-memory view and is reported through the returned error.
pub trait CredentialStore: Send + Sync {
    /// Current pair (logged out when nothing is stored)
    fn get(&self) -> CredentialPair;

    /// Replace the stored pair
    fn set(&self, pair: CredentialPair) -> Result<()>;

    /// Remove both credentials
    fn clear(&self) -> Result<()>;
}

/// Exchange of a refresh credential for a new access credential
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Call the refresh endpoint
    ///
    /// # Errors
    /// Returns the classified failure of the exchange. Client errors (4xx)
    /// mean the refresh credential was rejected.
    async fn refresh(&self, refresh_token: &str) -> std::result::Result<TokenBundle, ApiError>;
}

/// Receiver of the session-expired side effect
pub trait SessionListener: Send + Sync {
    /// The session ended and the user must re-authenticate at `reauth_path`
    fn session_expired(&self, reauth_path: &str);
}
