//! Message type definitions for client-server communication.
//!
//! Every frame is a JSON object whose `type` field names the variant, so
//! both directions decode into a closed enum and are handled with an
//! exhaustive match.
//!
//! # Example Messages
//!
//! ```json
//! {"type": "join_room"}
//! {"type": "start", "room_id": 1, "player": {"id": 1, "color": "black"}}
//! {"type": "move", "room_id": 1, "player": {"id": 1, "color": "black"}, "x": 3, "y": 4}
//! ```

use crate::board::{BoardSnapshot, Color};
use crate::game::Score;
use crate::matchmaking::{Player, Room, RoomId};
use serde::{Deserialize, Serialize};

/// A message sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask matchmaking for a room. Only valid on the matching endpoint.
    JoinRoom,
    /// Announce that this connection is ready to play in `room_id`.
    Start { room_id: RoomId, player: Player },
    /// Place a stone at 1-based board coordinates.
    Move {
        room_id: RoomId,
        player: Player,
        x: i32,
        y: i32,
    },
}

impl ClientMessage {
    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom => "join_room",
            ClientMessage::Start { .. } => "start",
            ClientMessage::Move { .. } => "move",
        }
    }
}

/// Progress of a matchmaking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Matched,
}

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MatchTimeout,
    IllegalMove,
    UnknownRoom,
    RoomFull,
    AlreadyJoined,
    BadRequest,
}

/// A message sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Matchmaking progress. `me` is present once the caller is matched.
    JoinRoom {
        status: MatchStatus,
        room: Room,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        me: Option<Player>,
    },
    /// The other side has not started yet.
    Waiting,
    /// Both sides have started.
    Ready,
    /// A move was applied; carries the board after captures.
    MoveApplied {
        mover: Player,
        x: i32,
        y: i32,
        board: BoardSnapshot,
    },
    /// The game is over. `winner` is `None` for a draw.
    Finished {
        winner: Option<Color>,
        score: Score,
        board: BoardSnapshot,
    },
    Error { kind: ErrorKind, message: String },
}

impl ServerMessage {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind,
            message: message.into(),
        }
    }

    /// Whether the connection should be closed after this message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerMessage::Finished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::matchmaking::PlayerId;
    use serde_json::json;

    #[test]
    fn test_client_message_format() {
        let message: ClientMessage = serde_json::from_value(json!({
            "type": "move",
            "room_id": 7,
            "player": {"id": 3, "color": "white"},
            "x": 6,
            "y": 5
        }))
        .unwrap();

        assert_eq!(
            message,
            ClientMessage::Move {
                room_id: RoomId(7),
                player: Player {
                    id: PlayerId(3),
                    color: Color::White
                },
                x: 6,
                y: 5
            }
        );
        assert_eq!(
            serde_json::from_value::<ClientMessage>(json!({"type": "join_room"})).unwrap(),
            ClientMessage::JoinRoom
        );
    }

    #[test]
    fn test_unknown_client_message_is_rejected() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "resign"})).is_err());
        assert!(serde_json::from_value::<ClientMessage>(json!({"room_id": 1})).is_err());
        assert!(serde_json::from_value::<ClientMessage>(json!({
            "type": "start",
            "room_id": 1,
            "player": {"id": 1, "color": "green"}
        }))
        .is_err());
    }

    #[test]
    fn test_join_room_response_format() {
        let host = Player {
            id: PlayerId(1),
            color: Color::Black,
        };
        let waiting = ServerMessage::JoinRoom {
            status: MatchStatus::Waiting,
            room: Room {
                id: RoomId(1),
                host,
                guest: None,
            },
            me: None,
        };

        let value = serde_json::to_value(&waiting).unwrap();
        assert_eq!(value["type"], "join_room");
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["room"]["id"], 1);
        assert!(value.get("me").is_none());
    }

    #[test]
    fn test_finished_format() {
        let finished = ServerMessage::Finished {
            winner: None,
            score: Score { black: 32, white: 32 },
            board: Board::new().snapshot(),
        };

        let value = serde_json::to_value(&finished).unwrap();
        assert_eq!(value["type"], "finished");
        assert!(value["winner"].is_null());
        assert_eq!(value["score"]["black"], 32);
        assert!(finished.is_terminal());
        assert!(!ServerMessage::Ready.is_terminal());

        let decoded: ServerMessage = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, finished);
    }

    #[test]
    fn test_error_format() {
        let value = serde_json::to_value(ServerMessage::error(ErrorKind::IllegalMove, "nope")).unwrap();
        assert_eq!(value, json!({"type": "error", "kind": "illegal_move", "message": "nope"}));
    }
}
