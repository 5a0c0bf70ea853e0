//! Session-expired listeners

pub mod listener;

pub use listener::{ChannelSessionListener, LoggingSessionListener};
