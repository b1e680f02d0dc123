//! Server configuration types and defaults.

use crate::matchmaking::DEFAULT_MATCH_TIMEOUT;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the game server.
///
/// Contains network settings, connection limits and the timeouts that
/// govern matchmaking and idle sessions.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Time allowed for a client to complete the WebSocket handshake
    pub connection_timeout: Duration,

    /// How long a host waits for a guest before the attempt fails
    pub match_timeout: Duration,

    /// Sessions with no activity for this long are dropped. Zero disables it.
    pub session_idle_timeout: Duration,

    /// How often idle sessions are looked for
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Whether the idle sweep should run at all.
    pub fn idle_sweep_enabled(&self) -> bool {
        !self.session_idle_timeout.is_zero() && !self.sweep_interval.is_zero()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            connection_timeout: Duration::from_secs(60),
            match_timeout: DEFAULT_MATCH_TIMEOUT,
            session_idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
