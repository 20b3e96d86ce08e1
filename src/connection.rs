//! Outbound connection handles.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

/// Process-unique identifier for a transport connection
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Cloneable outbound handle for one WebSocket connection.
///
/// Serialization happens eagerly and the frame is queued on an unbounded
/// channel owned by the connection's socket task. Sends are fire-and-forget:
/// a send to a connection whose task has exited is dropped silently.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Wrap the write side of a connection's outbound frame channel
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            outbound,
        }
    }

    /// Identifier of the underlying connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// True while the socket task still holds the receiving end
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queue a message for delivery; returns false when it was dropped
    pub fn send(&self, message: &ServerMessage) -> bool {
        match message.to_json() {
            Ok(frame) => self.outbound.send(frame).is_ok(),
            Err(e) => {
                tracing::warn!(connection_id = self.id, error = %e, "Failed to serialize outbound message");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);

        assert!(handle.is_open());
        assert!(handle.send(&ServerMessage::NewPeer {
            user_id: "alice".to_string(),
        }));

        let frame = rx.recv().await.unwrap();
        assert!(frame.contains(r#""type":"newPeer""#));
        assert!(frame.contains("alice"));
    }

    #[tokio::test]
    async fn test_send_to_closed_connection_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);
        drop(rx);

        assert!(!handle.is_open());
        assert!(!handle.send(&ServerMessage::Error {
            message: "unreachable".to_string(),
        }));
    }

    #[test]
    fn test_ids_are_unique() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = ConnectionHandle::new(tx.clone());
        let b = ConnectionHandle::new(tx);
        assert_ne!(a.id(), b.id());
    }
}
