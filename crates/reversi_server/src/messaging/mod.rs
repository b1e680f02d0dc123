//! Wire protocol: message types, JSON framing and routing.

pub mod router;
pub mod types;

pub use router::route_play_message;
pub use types::{ClientMessage, ErrorKind, MatchStatus, ServerMessage};

use crate::error::ProtocolError;

/// Decodes one text frame sent by a client.
pub fn decode_client(text: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

/// Encodes a server message as a JSON text frame.
pub fn encode_server(message: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}
