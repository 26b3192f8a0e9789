//! Logout notification.

use tokio::sync::broadcast;

/// Events published to interested listeners (route guards, UI state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Credentials were cleared after a failed refresh.
    LoggedOut,
}

/// Broadcast channel for auth events.
///
/// Clones share the channel; emitting with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct AuthSignal {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Publish `LoggedOut`; returns how many listeners received it.
    pub fn emit_logged_out(&self) -> usize {
        self.tx.send(AuthEvent::LoggedOut).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logout_reaches_subscribers() {
        let signal = AuthSignal::new();
        assert_eq!(signal.emit_logged_out(), 0);

        let mut rx = signal.subscribe();
        let clone = signal.clone();
        assert_eq!(clone.emit_logged_out(), 1);
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::LoggedOut);
    }
}
