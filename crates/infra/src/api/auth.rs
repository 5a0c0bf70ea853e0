//! Login, registration and logout
//!
//! Login and registration are anonymous: they never carry a bearer and a
//! 401 (wrong password) is returned to the caller instead of entering the
//! refresh protocol. Logout attaches the bearer but does not recover.

use facturo_domain::{ApiError, AuthSession, LoginRequest, RegisterRequest, Result};
use reqwest::Method;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::client::{encode, ApiClient};
use super::request::{AuthPolicy, RequestOptions};

impl ApiClient {
    /// Authenticate with email and password and store the issued pair
    ///
    /// # Errors
    ///
    /// Returns the classified failure; a rejected password is an
    /// `ApiError` with `is_auth_error()`.
    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> std::result::Result<AuthSession, ApiError> {
        let path = self.config().paths.login.clone();
        self.authenticate(&path, request).await
    }

    /// Create an account and store the issued pair
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> std::result::Result<AuthSession, ApiError> {
        let path = self.config().paths.register.clone();
        self.authenticate(&path, request).await
    }

    /// End the session
    ///
    /// The backend is notified on a best-effort basis; the local credentials
    /// are cleared whatever it answers, without the session-expired signal.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the persisted credentials could not be
    /// removed.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<()> {
        if self.is_authenticated() {
            let path = self.config().paths.logout.clone();
            let notified = match self.prepare(Method::POST, &path, None, &RequestOptions::new()) {
                Ok(descriptor) => {
                    self.dispatch(descriptor.with_auth(AuthPolicy::AttachOnly)).await.map(|_| ())
                }
                Err(err) => Err(err),
            };
            if let Err(err) = notified {
                warn!(error = %err, "logout notification failed");
            }
        }

        self.session().end_session()?;
        info!("logged out");
        Ok(())
    }

    async fn authenticate<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<AuthSession, ApiError> {
        let descriptor = self
            .prepare(Method::POST, path, Some(encode(body)?.into()), &RequestOptions::new())?
            .with_auth(AuthPolicy::Anonymous);

        let payload = self.dispatch(descriptor).await?;
        let status = payload.status;
        let session: AuthSession = payload.decode()?;

        let pair = session.tokens.clone().into_pair(None);
        if !pair.is_authenticated() {
            return Err(ApiError::response_decoding(status, "no refresh credential issued"));
        }
        if let Err(err) = self.session().establish(pair) {
            warn!(error = %err, "credentials kept in memory only");
        }

        info!("session established");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use facturo_core::CredentialStore;
    use facturo_domain::{ApiConfig, CredentialPair};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::storage::MemoryCredentialStore;

    fn client(server: &MockServer, store: Arc<MemoryCredentialStore>) -> ApiClient {
        ApiClient::builder()
            .config(ApiConfig::with_base_url(server.uri()))
            .credential_store(store)
            .build()
            .expect("api client")
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            email: "ana@facturo.test".into(),
            password: "hunter22".into(),
            remember: Some(true),
        }
    }

    #[tokio::test]
    async fn login_stores_issued_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({
                "email": "ana@facturo.test",
                "password": "hunter22",
                "remember": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Login successful",
                "data": {
                    "user": { "id": "u1", "email": "ana@facturo.test" },
                    "tokens": { "accessToken": "a1", "refreshToken": "r1", "expiresIn": 900 }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let client = client(&server, Arc::clone(&store));

        let session = client.login(&login_request()).await.unwrap();

        assert_eq!(session.user["id"], "u1");
        assert_eq!(store.get(), CredentialPair::new("a1", "r1"));
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn wrong_password_does_not_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "success": false, "message": "Invalid credentials" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("old", "old-r")));
        let client = client(&server, Arc::clone(&store));

        let err = client.login(&login_request()).await.unwrap_err();

        assert!(err.is_auth_error());
        assert_eq!(err.message(), "Invalid credentials");
        assert_eq!(store.get(), CredentialPair::new("old", "old-r"));
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("a1", "r1")));
        let client = client(&server, Arc::clone(&store));

        client.logout().await.unwrap();

        assert_eq!(store.get(), CredentialPair::logged_out());
        assert!(!client.is_authenticated());
    }
}
