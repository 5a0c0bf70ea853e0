use facturo_core::SessionListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Listener that only records the expiry in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSessionListener;

impl SessionListener for LoggingSessionListener {
    fn session_expired(&self, reauth_path: &str) {
        info!(reauth_path, "re-authentication required");
    }
}

/// Forwards re-authentication requests to a UI task
///
/// Each expiry sends the re-authentication path on an unbounded channel so
/// the receiving side can navigate without blocking the request pipeline.
#[derive(Debug, Clone)]
pub struct ChannelSessionListener {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelSessionListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl SessionListener for ChannelSessionListener {
    fn session_expired(&self, reauth_path: &str) {
        if self.sender.send(reauth_path.to_string()).is_err() {
            warn!(reauth_path, "re-authentication receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_listener_forwards_path() {
        let (listener, mut receiver) = ChannelSessionListener::new();

        listener.session_expired("/login");

        assert_eq!(receiver.try_recv().unwrap(), "/login");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_tolerated() {
        let (listener, receiver) = ChannelSessionListener::new();
        drop(receiver);

        listener.session_expired("/login");
    }
}
