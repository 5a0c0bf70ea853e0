//! In-memory credential store

use facturo_core::CredentialStore;
use facturo_domain::{CredentialPair, Result};
use parking_lot::RwLock;

/// Process-local store (lost on restart)
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<CredentialPair>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self { pair: RwLock::new(pair.normalized()) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> CredentialPair {
        self.pair.read().clone()
    }

    fn set(&self, pair: CredentialPair) -> Result<()> {
        *self.pair.write() = pair.normalized();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.pair.write() = CredentialPair::logged_out();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_normalizes_pairs() {
        let store = MemoryCredentialStore::new();
        assert!(!store.get().is_authenticated());

        store.set(CredentialPair::new("a", "r")).unwrap();
        assert_eq!(store.get().access_token(), Some("a"));

        store.clear().unwrap();
        assert_eq!(store.get(), CredentialPair::logged_out());
    }
}
