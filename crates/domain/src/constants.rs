//! Wire-level constants
//!
//! Header names, error codes and persisted key names shared by every layer.

// Headers
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
pub const BEARER_PREFIX: &str = "Bearer ";

// Machine codes carried by classified errors
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";
pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_ERROR";
pub const REQUEST_ENCODING_ERROR_CODE: &str = "REQUEST_ENCODING_ERROR";
pub const RESPONSE_DECODING_ERROR_CODE: &str = "RESPONSE_DECODING_ERROR";

// Persisted credential entries
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

// Messages
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: the server could not be reached";
pub const VALIDATION_ERROR_MESSAGE: &str = "Validation failed";
