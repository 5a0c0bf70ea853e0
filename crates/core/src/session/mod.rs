//! Credential lifecycle and 401 recovery

pub mod ports;
pub mod service;

pub use service::{RefreshState, SessionExpired, SessionService};
