//! Testing utilities and helpers
//!
//! Deterministic stand-ins for the runtime services in this crate:
//! - [`SequentialKeyProvider`]: predictable idempotency keys (`key-1`,
//!   `key-2`, ...) that also records how many keys were minted
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use facturo_common::idempotency::IdempotencyKeyProvider;
//! use facturo_common::testing::SequentialKeyProvider;
//!
//! let keys = SequentialKeyProvider::new("invoice");
//! assert_eq!(keys.new_key().as_str(), "invoice-1");
//! assert_eq!(keys.minted(), 1);
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::idempotency::{IdempotencyKey, IdempotencyKeyProvider};

/// Idempotency key provider producing `<prefix>-<n>`
#[derive(Debug)]
pub struct SequentialKeyProvider {
    prefix: String,
    minted: AtomicUsize,
}

impl SequentialKeyProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), minted: AtomicUsize::new(0) }
    }

    /// Number of keys handed out so far
    pub fn minted(&self) -> usize {
        self.minted.load(Ordering::SeqCst)
    }
}

impl Default for SequentialKeyProvider {
    fn default() -> Self {
        Self::new("key")
    }
}

impl IdempotencyKeyProvider for SequentialKeyProvider {
    fn new_key(&self) -> IdempotencyKey {
        let n = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        IdempotencyKey::from_string(format!("{}-{n}", self.prefix))
    }
}
