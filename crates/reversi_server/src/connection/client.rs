//! Per-connection metadata.

use super::{ConnectionId, Endpoint};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

/// Represents an individual client connection to the server.
///
/// # Fields
///
/// * `id` - Unique identifier, also used to tell session channels apart
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was established
/// * `endpoint` - Which protocol the client asked for during the handshake
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub id: ConnectionId,
    pub remote_addr: SocketAddr,
    pub connected_at: SystemTime,
    pub endpoint: Endpoint,
}

impl ClientConnection {
    /// Creates a connection record stamped with the current time.
    pub fn new(remote_addr: SocketAddr, endpoint: Endpoint) -> Self {
        Self {
            id: ConnectionId::new(),
            remote_addr,
            connected_at: SystemTime::now(),
            endpoint,
        }
    }

    /// How long the connection has been open.
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed().unwrap_or_default()
    }
}
