//! Request descriptors and per-call options

use facturo_common::IdempotencyKey;
use facturo_domain::constants::IDEMPOTENCY_KEY_HEADER;
use facturo_domain::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;

/// How a request relates to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Bearer attached; a 401 runs the refresh protocol once
    Recover,
    /// Bearer attached; a 401 is surfaced as is
    AttachOnly,
    /// No bearer; a 401 is surfaced as is
    Anonymous,
}

/// One logical call as it travels through the pipeline
///
/// Headers (including the idempotency key) are fixed when the descriptor is
/// built. Only the bearer header is added per attempt.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<RequestBody>,
    pub headers: HeaderMap,
    pub auth: AuthPolicy,
    is_retry: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            auth: AuthPolicy::Recover,
            is_retry: false,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Option<RequestBody>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn with_auth(mut self, auth: AuthPolicy) -> Self {
        self.auth = auth;
        self
    }

    /// Whether this descriptor has already been replayed after a refresh
    pub const fn is_retry(&self) -> bool {
        self.is_retry
    }

    /// Whether a 401 for this descriptor may enter the refresh protocol
    pub fn can_recover(&self) -> bool {
        self.auth == AuthPolicy::Recover && !self.is_retry
    }

    /// The replay sent after a successful refresh
    ///
    /// Returns `None` when the descriptor was already replayed.
    #[must_use]
    pub fn into_retry(mut self) -> Option<Self> {
        if self.is_retry {
            return None;
        }
        self.is_retry = true;
        Some(self)
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|v| v.to_str().ok())
    }

    pub(crate) fn set_idempotency_key(&mut self, key: &IdempotencyKey) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(key.as_str()).map_err(ApiError::request_encoding)?;
        self.headers.insert(IDEMPOTENCY_KEY_HEADER, value);
        Ok(())
    }
}

/// Payload of a request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    File(FileUpload),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<FileUpload> for RequestBody {
    fn from(upload: FileUpload) -> Self {
        Self::File(upload)
    }
}

/// A file sent as `multipart/form-data`
///
/// The bytes are held in memory so the form can be rebuilt for the replay
/// that follows a refresh.
#[derive(Clone)]
pub struct FileUpload {
    field: String,
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
    fields: Vec<(String, String)>,
}

impl FileUpload {
    /// Upload `bytes` under the `file` form field
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field_name(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// MIME type of the file part, e.g. `application/pdf`
    #[must_use]
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Extra text field sent alongside the file
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Build a fresh form for one attempt
    pub(crate) fn to_form(&self) -> Result<Form, ApiError> {
        let mut part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        if let Some(mime) = &self.content_type {
            part = part.mime_str(mime).map_err(ApiError::request_encoding)?;
        }

        let form = self
            .fields
            .iter()
            .fold(Form::new(), |form, (name, value)| form.text(name.clone(), value.clone()));
        Ok(form.part(self.field.clone(), part))
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Caller-supplied options for a single call
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) idempotency_key: Option<IdempotencyKey>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) mutation: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse a key generated when the user action started
    #[must_use]
    pub fn idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Treat the call as a user-intent mutation regardless of its verb
    #[must_use]
    pub fn mutation(mut self) -> Self {
        self.mutation = true;
        self
    }

    pub(crate) fn header_map(&self) -> Result<HeaderMap, ApiError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(ApiError::request_encoding)?;
            let value = HeaderValue::from_str(value).map_err(ApiError::request_encoding)?;
            map.append(name, value);
        }
        Ok(map)
    }
}

/// Verbs that carry an idempotency key by default
pub fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}
