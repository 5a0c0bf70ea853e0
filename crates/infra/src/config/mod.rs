//! Configuration loading
//!
//! Builds an [`facturo_domain::ApiConfig`] from environment variables or a
//! JSON/TOML file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, discover_config_path};
