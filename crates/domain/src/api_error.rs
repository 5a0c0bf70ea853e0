//! Classified API errors
//!
//! Every failure that leaves the API client is an [`ApiError`]. Transport
//! exceptions and raw HTTP responses are converted by [`classify`]; callers
//! branch on the predicates (`is_auth_error`, `is_server_error`, ...) or on
//! [`ApiError::presentation`] instead of re-deriving status thresholds.

use serde_json::Value;
use thiserror::Error;

use crate::constants::{
    NETWORK_ERROR_CODE, NETWORK_ERROR_MESSAGE, REQUEST_ENCODING_ERROR_CODE,
    RESPONSE_DECODING_ERROR_CODE, VALIDATION_ERROR_CODE, VALIDATION_ERROR_MESSAGE,
};

/// HTTP status used for validation failures
pub const VALIDATION_STATUS: u16 = 400;

/// Tag of a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// No HTTP response was received
    Network,
    /// 400 response carrying structured field errors
    Validation,
    /// Any other HTTP (or local request) failure
    Api,
}

/// Classified error returned by every API call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// DNS failure, timeout, refused or reset connection
    #[error("{message}")]
    Network { message: String },

    /// 400 with a structured `errors` field
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Any other failure
    ///
    /// `status_code` is `None` only for local failures that happened before
    /// a request could be sent (see [`ApiError::request_encoding`]).
    #[error("{message}")]
    Api {
        message: String,
        status_code: Option<u16>,
        code: Option<String>,
        details: Option<Value>,
    },
}

/// How a UI layer is expected to surface an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Session is gone; send the user to the login entry point
    Reauthenticate,
    /// Authenticated but not allowed
    Forbidden,
    /// Resource does not exist
    NotFound,
    /// Render `details` field by field
    FieldErrors,
    /// Server-side failure; show a generic "try again later"
    RetryLater,
    /// No connectivity
    Connectivity,
    /// Show the error message as is
    Message,
}

/// Raw failure as observed by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// The request never produced an HTTP response
    NoResponse { message: String },
    /// The server answered with a non-success status
    Response { status: u16, body: Option<Value> },
}

impl ApiError {
    /// Network error with the default message
    #[must_use]
    pub fn network() -> Self {
        Self::Network { message: NETWORK_ERROR_MESSAGE.to_string() }
    }

    /// The request body could not be serialized
    #[must_use]
    pub fn request_encoding(reason: impl std::fmt::Display) -> Self {
        Self::Api {
            message: format!("Failed to encode request body: {reason}"),
            status_code: None,
            code: Some(REQUEST_ENCODING_ERROR_CODE.to_string()),
            details: None,
        }
    }

    /// A successful response could not be decoded into the expected type
    #[must_use]
    pub fn response_decoding(status: u16, reason: impl std::fmt::Display) -> Self {
        Self::Api {
            message: format!("Failed to decode response: {reason}"),
            status_code: Some(status),
            code: Some(RESPONSE_DECODING_ERROR_CODE.to_string()),
            details: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Network { .. } => ApiErrorKind::Network,
            Self::Validation { .. } => ApiErrorKind::Validation,
            Self::Api { .. } => ApiErrorKind::Api,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message }
            | Self::Validation { message, .. }
            | Self::Api { message, .. } => message,
        }
    }

    /// HTTP status of the failure, `None` when no response was received
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Network { .. } => None,
            Self::Validation { .. } => Some(VALIDATION_STATUS),
            Self::Api { status_code, .. } => *status_code,
        }
    }

    /// Machine-readable code
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Network { .. } => Some(NETWORK_ERROR_CODE),
            Self::Validation { .. } => Some(VALIDATION_ERROR_CODE),
            Self::Api { code, .. } => code.as_deref(),
        }
    }

    #[must_use]
    pub const fn details(&self) -> Option<&Value> {
        match self {
            Self::Network { .. } => None,
            Self::Validation { details, .. } => Some(details),
            Self::Api { details, .. } => details.as_ref(),
        }
    }

    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self.status_code(), Some(401))
    }

    #[must_use]
    pub const fn is_forbidden_error(&self) -> bool {
        matches!(self.status_code(), Some(403))
    }

    #[must_use]
    pub const fn is_not_found_error(&self) -> bool {
        matches!(self.status_code(), Some(404))
    }

    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.status_code(), Some(status) if status >= 500)
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status_code(), Some(400..=499))
    }

    /// UI mapping for this error
    #[must_use]
    pub const fn presentation(&self) -> Presentation {
        match self {
            Self::Network { .. } => Presentation::Connectivity,
            Self::Validation { .. } => Presentation::FieldErrors,
            Self::Api { status_code, details, .. } => match status_code {
                Some(401) => Presentation::Reauthenticate,
                Some(403) => Presentation::Forbidden,
                Some(404) => Presentation::NotFound,
                Some(422) if details.is_some() => Presentation::FieldErrors,
                Some(status) if *status >= 500 => Presentation::RetryLater,
                _ => Presentation::Message,
            },
        }
    }
}

/// Classify a transport failure
///
/// 1. No response → [`ApiError::Network`] (`NETWORK_ERROR`, no status).
/// 2. 400 whose body has an `errors` field → [`ApiError::Validation`].
/// 3. Anything else → [`ApiError::Api`] with the server's message, status,
///    optional `code` and optional `details`.
#[must_use]
pub fn classify(failure: TransportFailure) -> ApiError {
    match failure {
        TransportFailure::NoResponse { message } => {
            if message.is_empty() {
                ApiError::network()
            } else {
                ApiError::Network { message: format!("{NETWORK_ERROR_MESSAGE} ({message})") }
            }
        }
        TransportFailure::Response { status, body } => classify_response(status, body),
    }
}

fn classify_response(status: u16, body: Option<Value>) -> ApiError {
    let mut body = match body {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    let message = string_field(&body, "message").or_else(|| string_field(&body, "error"));

    if status == VALIDATION_STATUS {
        if let Some(errors) = body.remove("errors").filter(|v| !v.is_null()) {
            return ApiError::Validation {
                message: message.unwrap_or_else(|| VALIDATION_ERROR_MESSAGE.to_string()),
                details: errors,
            };
        }
    }

    ApiError::Api {
        message: message.unwrap_or_else(|| format!("Request failed with status code {status}")),
        status_code: Some(status),
        code: string_field(&body, "code"),
        details: body.remove("details").filter(|v| !v.is_null()),
    }
}

fn string_field(body: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}
