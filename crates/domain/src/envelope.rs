//! Response envelope unwrapping
//!
//! The backend wraps payloads as `{ "success": bool, "message": string,
//! "data": T }`. Bodies without a boolean `success` field are passed through
//! untouched.

use serde_json::Value;

use crate::api_error::ApiError;

/// Extract the payload of a successful response
///
/// # Errors
/// Returns [`ApiError::Api`] when the envelope reports `success: false`
/// despite a 2xx status.
pub fn unwrap_envelope(status: u16, body: Value) -> Result<Value, ApiError> {
    match body {
        Value::Object(mut map) if map.get("success").is_some_and(Value::is_boolean) => {
            if map.get("success") == Some(&Value::Bool(false)) {
                let message = map
                    .get("message")
                    .or_else(|| map.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("Request was not successful")
                    .to_string();
                return Err(ApiError::Api {
                    message,
                    status_code: Some(status),
                    code: map.get("code").and_then(Value::as_str).map(str::to_string),
                    details: map.remove("details").filter(|v| !v.is_null()),
                });
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn returns_data_of_envelope() {
        let body = json!({ "success": true, "message": "ok", "data": { "id": "inv_1" } });
        assert_eq!(unwrap_envelope(200, body).unwrap(), json!({ "id": "inv_1" }));
    }

    #[test]
    fn envelope_without_data_is_null() {
        let body = json!({ "success": true, "message": "deleted" });
        assert_eq!(unwrap_envelope(200, body).unwrap(), Value::Null);
    }

    #[test]
    fn plain_body_passes_through() {
        let body = json!({ "items": [], "total": 0 });
        assert_eq!(unwrap_envelope(200, body.clone()).unwrap(), body);
        assert_eq!(unwrap_envelope(204, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn unsuccessful_envelope_is_an_error() {
        let body = json!({ "success": false, "message": "Quota exceeded", "code": "QUOTA" });
        let err = unwrap_envelope(200, body).unwrap_err();
        assert_eq!(err.message(), "Quota exceeded");
        assert_eq!(err.status_code(), Some(200));
        assert_eq!(err.code(), Some("QUOTA"));
    }
}
