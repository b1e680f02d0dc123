//! Rooms and the players matched into them.

use crate::board::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a room, unique for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier handed out to every matchmaking registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered player and the side assigned to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub color: Color,
}

/// A matchmaking unit: the host who opened it and, once matched, the guest.
///
/// The guest is attached at most once and the room is never changed after
/// that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub host: Player,
    #[serde(default)]
    pub guest: Option<Player>,
}

impl Room {
    /// Whether the room is still waiting for a guest.
    pub fn is_open(&self) -> bool {
        self.guest.is_none()
    }
}
