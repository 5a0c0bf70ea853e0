//! Conversion of transport results into classified errors
//!
//! `reqwest` types stop here: everything above this module sees
//! [`ApiError`] and JSON values only.

use facturo_domain::{classify, ApiError, TransportFailure};
use reqwest::{Response, StatusCode};
use serde_json::Value;

/// Classify a `reqwest` failure that produced no response
pub fn from_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        return ApiError::request_encoding(err);
    }
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    };
    classify(TransportFailure::NoResponse { message: reason })
}

/// Classify a non-success response, consuming its body
pub async fn from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<Value>(&bytes).ok(),
        _ => None,
    };
    classify(TransportFailure::Response { status, body })
}

/// Read the JSON payload of a successful response
///
/// 204/205 and empty bodies read as `null`.
///
/// # Errors
/// Returns a `RESPONSE_DECODING_ERROR` when the body is not JSON.
pub async fn read_payload(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return Ok(Value::Null);
    }

    let bytes = response.bytes().await.map_err(from_transport_error)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|err| ApiError::response_decoding(status.as_u16(), err))
}
