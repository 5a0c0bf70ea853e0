//! Credential pair and token payloads

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access and refresh credential held by the client
///
/// Either both tokens are present (logged in) or both are absent (logged
/// out). Constructors normalise a half-populated pair to the logged-out
/// state so an access token never outlives its refresh token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl CredentialPair {
    /// Logged-in pair
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self::from_parts(Some(access_token.into()), Some(refresh_token.into()))
    }

    /// Logged-out pair
    #[must_use]
    pub const fn logged_out() -> Self {
        Self { access_token: None, refresh_token: None }
    }

    /// Build from optional parts, enforcing the both-or-neither invariant
    #[must_use]
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        let access_token = access_token.filter(|t| !t.is_empty());
        let refresh_token = refresh_token.filter(|t| !t.is_empty());
        match (access_token, refresh_token) {
            (Some(access), Some(refresh)) => {
                Self { access_token: Some(access), refresh_token: Some(refresh) }
            }
            _ => Self::logged_out(),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }

    /// Re-apply the invariant after deserialising from storage
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::from_parts(self.access_token, self.refresh_token)
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Tokens issued by login, registration or refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenBundle {
    /// Merge into a credential pair, keeping `previous_refresh` when the
    /// server did not rotate the refresh token
    #[must_use]
    pub fn into_pair(self, previous_refresh: Option<&str>) -> CredentialPair {
        let refresh = self.refresh_token.or_else(|| previous_refresh.map(str::to_string));
        CredentialPair::from_parts(Some(self.access_token), refresh)
    }
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Payload returned by login and registration
///
/// The user record is opaque to the client core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthSession {
    #[serde(default)]
    pub user: Value,
    pub tokens: TokenBundle,
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}
