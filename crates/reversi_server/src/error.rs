//! Infrastructure error types.
//!
//! Rule and matchmaking failures live next to the code that produces them
//! ([`IllegalMove`](crate::board::IllegalMove),
//! [`MatchError`](crate::matchmaking::MatchError),
//! [`SessionError`](crate::registry::SessionError)); the types here cover
//! transport and protocol failures that end a connection task.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while decoding or encoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors that can occur during server operation.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket setup, binding or accept failures
    #[error("Network error: {0}")]
    Network(String),
    /// WebSocket handshake or framing failures
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
