//! Credential persistence

pub mod credentials;
pub mod keychain;

pub use credentials::MemoryCredentialStore;
pub use keychain::{KeychainCredentialStore, KeychainVault, SecretVault};
