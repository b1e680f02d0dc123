//! Outbound message channel for a single connection.
//!
//! Session code never touches sockets. Each play connection owns a writer
//! task that drains an unbounded queue into the WebSocket sink, and the rest
//! of the server pushes [`ServerMessage`]s into that queue through a
//! [`ClientChannel`].

use super::ConnectionId;
use crate::messaging::ServerMessage;
use tokio::sync::mpsc;

/// Handle used to queue messages for one connection.
///
/// Cloning the handle is cheap; all clones feed the same writer task.
#[derive(Debug, Clone)]
pub struct ClientChannel {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Raised when the connection's writer task has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected(pub ConnectionId);

impl ClientChannel {
    /// Creates a channel and the receiving half its writer task drains.
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message for delivery.
    ///
    /// # Returns
    ///
    /// `Err(Disconnected)` if the connection is closed and the message was
    /// dropped.
    pub fn send(&self, message: ServerMessage) -> Result<(), Disconnected> {
        self.tx.send(message).map_err(|_| Disconnected(self.id))
    }

    /// Whether the writer task is still accepting messages.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_after_receiver_dropped_fails() {
        let id = ConnectionId::new();
        let (channel, rx) = ClientChannel::new(id);
        assert!(channel.send(ServerMessage::Ready).is_ok());
        assert!(channel.is_open());

        drop(rx);
        assert!(!channel.is_open());
        assert_eq!(channel.send(ServerMessage::Waiting), Err(Disconnected(id)));
    }
}
