//! Platform keychain credential store
//!
//! The pair is persisted as two secrets under one keychain service, named
//! after the wire keys (`accessToken`, `refreshToken`). The store keeps the
//! current pair behind a lock so reads never reach the keychain; every change
//! writes through.
//!
//! ```no_run
//! use facturo_core::CredentialStore;
//! use facturo_domain::CredentialPair;
//! use facturo_infra::storage::KeychainCredentialStore;
//!
//! let store = KeychainCredentialStore::open("facturo");
//! store.set(CredentialPair::new("access", "refresh"))?;
//! # Ok::<(), facturo_domain::FacturoError>(())
//! ```

use std::sync::Arc;

use facturo_core::CredentialStore;
use facturo_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use facturo_domain::{CredentialPair, FacturoError, Result};
use keyring::Entry;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Named secret storage
pub trait SecretVault: Send + Sync {
    /// Read a secret, `None` when it was never stored
    fn get_secret(&self, key: &str) -> Result<Option<String>>;

    fn set_secret(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a secret (idempotent)
    fn delete_secret(&self, key: &str) -> Result<()>;
}

/// Secrets in the platform keychain (macOS Keychain, Windows Credential
/// Manager, Linux kernel keyring)
#[derive(Debug, Clone)]
pub struct KeychainVault {
    service: String,
}

impl KeychainVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(|err| keychain_error("open", key, &err))
    }
}

impl SecretVault for KeychainVault {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(keychain_error("read", key, &err)),
        }
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        debug!(service = %self.service, key, "storing secret in keychain");
        self.entry(key)?.set_password(value).map_err(|err| keychain_error("store", key, &err))
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(keychain_error("delete", key, &err)),
        }
    }
}

fn keychain_error(action: &str, key: &str, err: &keyring::Error) -> FacturoError {
    FacturoError::Storage(format!("failed to {action} keychain entry {key}: {err}"))
}

/// Credential store persisting to a [`SecretVault`]
pub struct KeychainCredentialStore {
    vault: Arc<dyn SecretVault>,
    pair: RwLock<CredentialPair>,
}

impl KeychainCredentialStore {
    /// Open the store on the platform keychain under `service`
    pub fn open(service: impl Into<String>) -> Self {
        Self::with_vault(Arc::new(KeychainVault::new(service)))
    }

    /// Open the store on any vault, loading the persisted pair
    ///
    /// An unreadable vault or a half-populated pair loads as logged out.
    pub fn with_vault(vault: Arc<dyn SecretVault>) -> Self {
        let pair = match load_pair(vault.as_ref()) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "credential vault unreadable; starting logged out");
                CredentialPair::logged_out()
            }
        };
        debug!(authenticated = pair.is_authenticated(), "credential store opened");
        Self { vault, pair: RwLock::new(pair) }
    }

    fn persist(&self, pair: &CredentialPair) -> Result<()> {
        match (pair.access_token(), pair.refresh_token()) {
            (Some(access), Some(refresh)) => {
                self.vault.set_secret(ACCESS_TOKEN_KEY, access)?;
                self.vault.set_secret(REFRESH_TOKEN_KEY, refresh)
            }
            _ => self.erase(),
        }
    }

    fn erase(&self) -> Result<()> {
        let access = self.vault.delete_secret(ACCESS_TOKEN_KEY);
        let refresh = self.vault.delete_secret(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn get(&self) -> CredentialPair {
        self.pair.read().clone()
    }

    fn set(&self, pair: CredentialPair) -> Result<()> {
        let pair = pair.normalized();
        let mut guard = self.pair.write();
        *guard = pair.clone();
        self.persist(&pair)
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.pair.write();
        *guard = CredentialPair::logged_out();
        self.erase()
    }
}

impl std::fmt::Debug for KeychainCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainCredentialStore")
            .field("pair", &*self.pair.read())
            .finish_non_exhaustive()
    }
}

fn load_pair(vault: &dyn SecretVault) -> Result<CredentialPair> {
    let access = vault.get_secret(ACCESS_TOKEN_KEY)?;
    let refresh = vault.get_secret(REFRESH_TOKEN_KEY)?;
    Ok(CredentialPair::from_parts(access, refresh))
}
