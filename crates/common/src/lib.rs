//! Modular common utilities shared across Facturo crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: idempotency keys
//! - `runtime`: async infrastructure (single-flight execution)
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: deterministic test doubles

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod idempotency;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod sync;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "foundation", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use idempotency::{IdempotencyKey, IdempotencyKeyProvider, RandomKeyProvider};
#[cfg(feature = "runtime")]
pub use sync::{Flight, SingleFlight};
