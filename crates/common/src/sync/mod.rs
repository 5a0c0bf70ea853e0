//! Synchronization primitives for concurrent async callers
//!
//! ## Submodules
//!
//! - **`single_flight`**: collapse concurrent requests for the same expensive
//!   operation into one shared in-flight execution

pub mod single_flight;

pub use single_flight::{Flight, SingleFlight};
