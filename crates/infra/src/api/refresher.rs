//! Refresh endpoint client

use async_trait::async_trait;
use facturo_core::TokenRefresher;
use facturo_domain::constants::REFRESH_TOKEN_KEY;
use facturo_domain::{unwrap_envelope, ApiError, TokenBundle};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::errors::{from_response, read_payload};
use crate::http::HttpClient;

/// Exchanges the refresh credential at `POST <base>/auth/refresh`
///
/// The request is anonymous: it carries the refresh credential in the body
/// and never an access credential.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    http: HttpClient,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenBundle, ApiError> {
        let request = self
            .http
            .request(Method::POST, &self.url)
            .json(&json!({ REFRESH_TOKEN_KEY: refresh_token }));

        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%status, "refresh endpoint rejected the exchange");
            return Err(from_response(response).await);
        }

        let payload = unwrap_envelope(status.as_u16(), read_payload(response).await?)?;
        parse_tokens(payload).map_err(|err| ApiError::response_decoding(status.as_u16(), err))
    }
}

/// Accepts `{ tokens: { accessToken, ... } }` or a bare `{ accessToken, ... }`
pub(crate) fn parse_tokens(mut payload: Value) -> Result<TokenBundle, serde_json::Error> {
    let tokens = match payload.get_mut("tokens") {
        Some(tokens) => tokens.take(),
        None => payload,
    };
    serde_json::from_value(tokens)
}
