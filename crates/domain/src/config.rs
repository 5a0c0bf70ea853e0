//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// API client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Total transport attempts per wire call (1 disables transport retry)
    pub transport_attempts: usize,
    /// Base delay between transport attempts, doubled on each retry
    #[serde(with = "duration_millis")]
    pub retry_backoff: Duration,
    /// Authentication endpoint paths
    pub paths: AuthPaths,
    /// Re-authentication entry point signalled when the session expires
    pub reauth_path: String,
    /// Platform keychain service holding the persisted credentials
    pub keychain_service: String,
}

/// Authentication endpoint paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPaths {
    pub refresh: String,
    pub login: String,
    pub register: String,
    pub logout: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout: Duration::from_secs(10),
            transport_attempts: 1,
            retry_backoff: Duration::from_millis(200),
            paths: AuthPaths::default(),
            reauth_path: "/login".to_string(),
            keychain_service: "facturo".to_string(),
        }
    }
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            refresh: "/auth/refresh".to_string(),
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            logout: "/auth/logout".to_string(),
        }
    }
}

impl ApiConfig {
    /// Configuration pointing at `base_url` with every other field defaulted
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Join the base URL and a request path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_without_double_slash() {
        let config = ApiConfig::with_base_url("https://api.facturo.test/api/");
        assert_eq!(config.url_for("/invoices"), "https://api.facturo.test/api/invoices");
        assert_eq!(config.url_for("clients/1"), "https://api.facturo.test/api/clients/1");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ApiConfig =
            serde_json::from_str(r#"{ "base_url": "https://x.test", "timeout": 3 }"#).unwrap();
        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.transport_attempts, 1);
        assert_eq!(config.paths.refresh, "/auth/refresh");
        assert_eq!(config.reauth_path, "/login");
    }
}
