//! Idempotency keys for user-initiated mutations
//!
//! A key identifies one logical mutation ("create this invoice"), not one
//! wire call. It is generated once when the action is dispatched and reused
//! by every transport attempt belonging to that action, including the replay
//! that follows a credential refresh. A new user action always gets a new
//! key.
//!
//! Key generation cannot fail: [`RandomKeyProvider`] draws 122 random bits
//! from the operating system and falls back to a process-local sequence
//! generator when the entropy source is unavailable.

use std::fmt;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use uuid::{Builder, Uuid};

/// Opaque idempotency key sent in the `Idempotency-Key` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap a caller-supplied key
    ///
    /// Used when the caller already minted a key for a user action and wants
    /// every re-submission of that action to share it.
    #[must_use]
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for IdempotencyKey {
    fn from(value: Uuid) -> Self {
        Self(value.hyphenated().to_string())
    }
}

/// Source of idempotency keys
pub trait IdempotencyKeyProvider: Send + Sync {
    /// Mint a key for a new logical mutation
    fn new_key(&self) -> IdempotencyKey;
}

/// UUID v4 keys from the OS entropy source
#[derive(Debug, Default)]
pub struct RandomKeyProvider {
    fallback: SequenceKeyGenerator,
}

impl RandomKeyProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn random_key(&self, rng: &mut impl RngCore) -> IdempotencyKey {
        let mut bytes = [0_u8; 16];
        match rng.try_fill_bytes(&mut bytes) {
            Ok(()) => Builder::from_random_bytes(bytes).into_uuid().into(),
            Err(_) => self.fallback.next_key(),
        }
    }
}

impl IdempotencyKeyProvider for RandomKeyProvider {
    fn new_key(&self) -> IdempotencyKey {
        self.random_key(&mut OsRng)
    }
}

/// Deterministic fallback generator
///
/// Packs the process id, the creation timestamp and a monotonically
/// increasing counter into a UUID-shaped key. Unique within a process and,
/// with overwhelming likelihood, across processes started at different
/// instants.
#[derive(Debug)]
pub struct SequenceKeyGenerator {
    seed: u64,
    counter: AtomicU64,
}

impl SequenceKeyGenerator {
    #[must_use]
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        Self { seed: nanos ^ (u64::from(process::id()) << 32), counter: AtomicU64::new(0) }
    }

    /// Next key in the sequence
    pub fn next_key(&self) -> IdempotencyKey {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0_u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_be_bytes());
        bytes[8..].copy_from_slice(&sequence.to_be_bytes());
        Builder::from_random_bytes(bytes).into_uuid().into()
    }
}

impl Default for SequenceKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdempotencyKeyProvider for SequenceKeyGenerator {
    fn new_key(&self) -> IdempotencyKey {
        self.next_key()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::Error as RandError;

    use super::*;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), RandError> {
            Err(RandError::new("entropy source unavailable"))
        }
    }

    #[test]
    fn random_keys_are_uuid_v4() {
        let key = RandomKeyProvider::new().new_key();
        let parsed = Uuid::parse_str(key.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn independent_keys_differ() {
        let provider = RandomKeyProvider::new();
        let keys: HashSet<_> = (0..1_000).map(|_| provider.new_key()).collect();
        assert_eq!(keys.len(), 1_000);
    }

    #[test]
    fn falls_back_when_entropy_is_unavailable() {
        let provider = RandomKeyProvider::new();
        let first = provider.random_key(&mut BrokenRng);
        let second = provider.random_key(&mut BrokenRng);

        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn caller_supplied_key_is_kept_verbatim() {
        let key = IdempotencyKey::from_string("invoice-draft-42");
        assert_eq!(key.to_string(), "invoice-draft-42");
        assert_eq!(key.into_inner(), "invoice-draft-42");
    }
}
