//! API client façade
//!
//! Every verb runs through one pipeline: build the descriptor (extra
//! headers, idempotency key), attach the current bearer, send, and on a 401
//! let the session service recover once before replaying the identical
//! descriptor. Successful bodies are unwrapped from the `{ success, message,
//! data }` envelope; failures leave as [`ApiError`]. File uploads take the
//! same path with a multipart body rebuilt for every attempt.

use std::sync::Arc;

use facturo_common::{IdempotencyKeyProvider, RandomKeyProvider};
use facturo_core::{
    CredentialStore, RefreshState, SessionExpired, SessionListener, SessionService, TokenRefresher,
};
use facturo_domain::constants::{AUTHORIZATION_HEADER, BEARER_PREFIX};
use facturo_domain::{unwrap_envelope, ApiConfig, ApiError, FacturoError};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::errors::{from_response, read_payload};
use super::refresher::HttpTokenRefresher;
use super::request::{
    is_mutating, AuthPolicy, FileUpload, RequestBody, RequestDescriptor, RequestOptions,
};
use crate::http::HttpClient;
use crate::session::LoggingSessionListener;
use crate::storage::KeychainCredentialStore;

const HEALTH_PATH: &str = "/health";

/// Unwrapped payload of a successful call
pub(crate) struct Payload {
    pub status: u16,
    pub data: Value,
}

impl Payload {
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.data)
            .map_err(|err| ApiError::response_decoding(self.status, err))
    }
}

/// Authenticated API client
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    config: ApiConfig,
    session: Arc<SessionService>,
    keys: Arc<dyn IdempotencyKeyProvider>,
}

impl ApiClient {
    /// Create a client with the given credential store and default
    /// collaborators
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// built
    pub fn new(config: ApiConfig, store: Arc<dyn CredentialStore>) -> Result<Self, FacturoError> {
        Self::builder().config(config).credential_store(store).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Session owning the credentials of this client
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.session.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.credentials().is_authenticated()
    }

    /// Execute a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, RequestOptions::new()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, options).await
    }

    /// Execute a POST request
    ///
    /// A fresh idempotency key is attached unless `post_with` supplies one.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_with(path, body, RequestOptions::new()).await
    }

    pub async fn post_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(encode(body)?), options).await
    }

    /// Execute a PUT request
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.put_with(path, body, RequestOptions::new()).await
    }

    pub async fn put_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(encode(body)?), options).await
    }

    /// Execute a PATCH request
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.patch_with(path, body, RequestOptions::new()).await
    }

    pub async fn patch_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(encode(body)?), options).await
    }

    /// Execute a DELETE request
    ///
    /// No idempotency key unless the options mark the call as a mutation or
    /// supply a key.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None, RequestOptions::new()).await
    }

    pub async fn delete_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None, options).await
    }

    /// Upload a file as `multipart/form-data` (POST)
    ///
    /// The call carries the bearer and an idempotency key like any other
    /// mutation, and is replayed once after a refresh.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: FileUpload,
    ) -> Result<T, ApiError> {
        self.upload_file_with(path, upload, RequestOptions::new()).await
    }

    pub async fn upload_file_with<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: FileUpload,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        debug!(file_name = upload.file_name(), size = upload.len(), "uploading file");
        self.execute(Method::POST, path, Some(RequestBody::File(upload)), options).await
    }

    /// Execute an arbitrary request through the pipeline
    ///
    /// # Errors
    ///
    /// Returns the classified failure. A 401 surfaces only after the refresh
    /// protocol has been tried once.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute(method, path, body.map(RequestBody::Json), options).await
    }

    #[instrument(skip_all, fields(method = %method, path = %path))]
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let descriptor = self.prepare(method, path, body, &options)?;
        let payload = self.dispatch(descriptor).await?;
        debug!(status = payload.status, "request succeeded");
        payload.decode()
    }

    /// Check API reachability (unauthenticated)
    pub async fn health_check(&self) -> bool {
        let descriptor = RequestDescriptor::new(Method::GET, HEALTH_PATH)
            .with_auth(AuthPolicy::Anonymous);

        match self.send(&descriptor, None).await {
            Ok(response) if response.status().is_success() => {
                info!("API is healthy");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "API returned non-success status");
                false
            }
            Err(err) => {
                warn!(error = %err, "Health check failed");
                false
            }
        }
    }

    /// Build the descriptor for one logical call
    ///
    /// The idempotency key is fixed here, before any attempt is made.
    pub(crate) fn prepare(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: &RequestOptions,
    ) -> Result<RequestDescriptor, ApiError> {
        let mutation = options.mutation || is_mutating(&method);
        let mut descriptor = RequestDescriptor::new(method, path).with_body(body);
        descriptor.headers = options.header_map()?;

        match &options.idempotency_key {
            Some(key) => descriptor.set_idempotency_key(key)?,
            None if mutation => descriptor.set_idempotency_key(&self.keys.new_key())?,
            None => {}
        }
        Ok(descriptor)
    }

    /// Send a descriptor, recovering from one 401 when its policy allows
    pub(crate) async fn dispatch(&self, descriptor: RequestDescriptor) -> Result<Payload, ApiError> {
        let sent_with = match descriptor.auth {
            AuthPolicy::Anonymous => None,
            AuthPolicy::Recover | AuthPolicy::AttachOnly => self.session.access_token(),
        };

        let response = self.send(&descriptor, sent_with.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !descriptor.can_recover() {
            return settle(response).await;
        }

        let original = from_response(response).await;
        debug!(had_token = sent_with.is_some(), "access credential rejected");

        let token = match self.session.recover(sent_with.as_deref()).await {
            Ok(token) => token,
            Err(SessionExpired) => return Err(original),
        };

        let Some(replay) = descriptor.into_retry() else {
            return Err(original);
        };
        let response = self.send(&replay, Some(&token)).await?;
        settle(response).await
    }

    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        access_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.config.url_for(&descriptor.path);
        let mut request =
            self.http.request(descriptor.method.clone(), url).headers(descriptor.headers.clone());

        if let Some(token) = access_token {
            request = request.header(AUTHORIZATION_HEADER, format!("{BEARER_PREFIX}{token}"));
        }
        match &descriptor.body {
            Some(RequestBody::Json(body)) => request = request.json(body),
            Some(RequestBody::File(upload)) => request = request.multipart(upload.to_form()?),
            None => {}
        }

        debug!(
            method = %descriptor.method,
            path = %descriptor.path,
            is_retry = descriptor.is_retry(),
            bearer = access_token.is_some(),
            idempotency_key = descriptor.idempotency_key().is_some(),
            "dispatching request"
        );
        self.http.send(request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

pub(crate) fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(ApiError::request_encoding)
}

async fn settle(response: Response) -> Result<Payload, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(from_response(response).await);
    }
    let body = read_payload(response).await?;
    let data = unwrap_envelope(status.as_u16(), body)?;
    Ok(Payload { status: status.as_u16(), data })
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    store: Option<Arc<dyn CredentialStore>>,
    listener: Option<Arc<dyn SessionListener>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    keys: Option<Arc<dyn IdempotencyKeyProvider>>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential store (defaults to the platform keychain under
    /// `config.keychain_service`)
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the session-expired listener (defaults to logging only)
    pub fn session_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Replace the refresh endpoint client
    pub fn token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Set the idempotency key source (defaults to random UUIDs)
    pub fn key_provider(mut self, keys: Arc<dyn IdempotencyKeyProvider>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// built
    pub fn build(self) -> Result<ApiClient, FacturoError> {
        let config = self.config.unwrap_or_default();
        url::Url::parse(&config.base_url).map_err(|err| {
            FacturoError::Config(format!("invalid base URL {}: {err}", config.base_url))
        })?;

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.transport_attempts)
            .base_backoff(config.retry_backoff)
            .user_agent(concat!("facturo-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let store = self.store.unwrap_or_else(|| {
            Arc::new(KeychainCredentialStore::open(config.keychain_service.clone()))
        });
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpTokenRefresher::new(http.clone(), config.url_for(&config.paths.refresh)))
        });
        let listener = self.listener.unwrap_or_else(|| Arc::new(LoggingSessionListener));
        let keys = self.keys.unwrap_or_else(|| Arc::new(RandomKeyProvider::new()));

        let session = Arc::new(SessionService::new(
            store,
            refresher,
            listener,
            config.reauth_path.clone(),
        ));

        Ok(ApiClient { http, config, session, keys })
    }
}
