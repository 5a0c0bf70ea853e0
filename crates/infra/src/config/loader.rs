//! Configuration loader
//!
//! Loads the API client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `FACTURO_API_BASE_URL` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `FACTURO_API_BASE_URL`: API base URL (required)
//! - `FACTURO_API_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `FACTURO_TRANSPORT_ATTEMPTS`: Transport attempts per wire call
//! - `FACTURO_KEYCHAIN_SERVICE`: Keychain service holding the credentials
//! - `FACTURO_REAUTH_PATH`: Re-authentication entry point
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./facturo.json` or `./facturo.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use facturo_domain::{ApiConfig, FacturoError, Result};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `FacturoError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The base URL is not a valid absolute URL
pub fn load() -> Result<ApiConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only the base URL is required; unset optional variables keep their
/// defaults.
///
/// # Errors
/// Returns `FacturoError::Config` if the base URL is missing or any value is
/// invalid.
pub fn load_from_env() -> Result<ApiConfig> {
    let mut config = ApiConfig::with_base_url(env_var("FACTURO_API_BASE_URL")?);

    if let Some(secs) = env_parse::<u64>("FACTURO_API_TIMEOUT_SECS")? {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(attempts) = env_parse::<usize>("FACTURO_TRANSPORT_ATTEMPTS")? {
        config.transport_attempts = attempts;
    }
    if let Ok(service) = std::env::var("FACTURO_KEYCHAIN_SERVICE") {
        config.keychain_service = service;
    }
    if let Ok(path) = std::env::var("FACTURO_REAUTH_PATH") {
        config.reauth_path = path;
    }

    validate(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `FacturoError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ApiConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FacturoError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => discover_config_path().ok_or_else(|| {
            FacturoError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FacturoError::Config(format!("Failed to read config file: {e}")))?;

    validate(parse_config(&contents, &config_path)?)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ApiConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FacturoError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FacturoError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FacturoError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_path() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["facturo.json", "facturo.toml", "config.json", "config.toml"];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Check the base URL and normalise it
fn validate(mut config: ApiConfig) -> Result<ApiConfig> {
    let parsed = url::Url::parse(&config.base_url).map_err(|e| {
        FacturoError::Config(format!("Invalid base URL {}: {e}", config.base_url))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FacturoError::Config(format!(
            "Unsupported base URL scheme: {}",
            parsed.scheme()
        )));
    }
    if config.transport_attempts == 0 {
        return Err(FacturoError::Config("transport_attempts must be at least 1".to_string()));
    }

    config.base_url = config.base_url.trim_end_matches('/').to_string();
    Ok(config)
}

/// Get required environment variable
///
/// # Errors
/// Returns `FacturoError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        FacturoError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| FacturoError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}
