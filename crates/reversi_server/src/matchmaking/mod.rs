//! Matchmaking: pairs waiting players into rooms.
//!
//! A join either attaches the caller as guest of the oldest open room or
//! opens a new room with the caller as host. A waiting host is woken through
//! a one-shot channel the moment a guest attaches, bounded by a deadline.
//! All room state sits behind a single lock, and room and player ids are
//! handed out under that same lock.

pub mod room;

pub use room::{Player, PlayerId, Room, RoomId};

use crate::board::Color;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// Default time a host waits for a guest before giving up.
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Color of the player who opens a room. The guest gets the opposite one.
pub const HOST_COLOR: Color = Color::Black;

/// Errors that end a matchmaking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no opponent joined room {room} within {waited:?}")]
    Timeout { room: RoomId, waited: Duration },
    #[error("room {0} was closed before an opponent joined")]
    RoomClosed(RoomId),
}

/// Result of [`RoomRegistry::join`].
#[derive(Debug)]
pub enum Join {
    /// The caller became the guest of an existing room.
    Matched { room: Room, me: Player },
    /// The caller opened a new room and has to wait for a guest.
    Waiting(WaitingHost),
}

/// A host waiting for its room to be matched.
#[derive(Debug)]
pub struct WaitingHost {
    room: Room,
    me: Player,
    notify: oneshot::Receiver<Room>,
}

impl WaitingHost {
    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn me(&self) -> Player {
        self.me
    }
}

#[derive(Debug)]
struct RoomEntry {
    room: Room,
    notify: Option<oneshot::Sender<Room>>,
}

#[derive(Debug, Default)]
struct RoomTable {
    rooms: BTreeMap<RoomId, RoomEntry>,
    last_room_id: u32,
    last_player_id: u32,
}

impl RoomTable {
    fn next_player_id(&mut self) -> PlayerId {
        self.last_player_id += 1;
        PlayerId(self.last_player_id)
    }

    fn next_room_id(&mut self) -> RoomId {
        self.last_room_id += 1;
        RoomId(self.last_room_id)
    }

    fn oldest_open_room(&self) -> Option<RoomId> {
        self.rooms
            .values()
            .find(|entry| entry.room.is_open())
            .map(|entry| entry.room.id)
    }
}

/// Registry of all rooms known to the server.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    table: Mutex<RoomTable>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new player and matches them.
    ///
    /// Open rooms are tried oldest first. A room whose host has already gone
    /// away (nobody is listening for the match any more) is discarded and the
    /// search continues, so a guest is never matched into a dead room.
    pub async fn join(&self) -> Join {
        let mut guard = self.table.lock().await;
        let table = &mut *guard;
        let player_id = table.next_player_id();

        while let Some(room_id) = table.oldest_open_room() {
            let Some(entry) = table.rooms.get_mut(&room_id) else {
                break;
            };
            let me = Player {
                id: player_id,
                color: entry.room.host.color.opponent(),
            };
            entry.room.guest = Some(me);
            let room = entry.room.clone();

            let delivered = entry
                .notify
                .take()
                .is_some_and(|notify| notify.send(room.clone()).is_ok());
            if delivered {
                info!("🤝 Player {} matched into room {} as {}", me.id, room.id, me.color);
                return Join::Matched { room, me };
            }

            warn!("Host of room {} is gone, discarding the room", room_id);
            table.rooms.remove(&room_id);
        }

        let me = Player {
            id: player_id,
            color: HOST_COLOR,
        };
        let room = Room {
            id: table.next_room_id(),
            host: me,
            guest: None,
        };
        let (sender, notify) = oneshot::channel();
        table.rooms.insert(
            room.id,
            RoomEntry {
                room: room.clone(),
                notify: Some(sender),
            },
        );
        info!("🚪 Player {} opened room {} and is waiting", me.id, room.id);

        Join::Waiting(WaitingHost { room, me, notify })
    }

    /// Waits until a guest attaches to the host's room or `deadline` passes.
    ///
    /// On timeout the room is removed so no later guest can land in it. A
    /// guest that attached at the same instant still wins.
    pub async fn wait_for_guest(
        &self,
        waiting: WaitingHost,
        deadline: Duration,
    ) -> Result<Room, MatchError> {
        let WaitingHost { room, notify, .. } = waiting;

        match tokio::time::timeout(deadline, notify).await {
            Ok(Ok(matched)) => Ok(matched),
            Ok(Err(_)) => Err(MatchError::RoomClosed(room.id)),
            Err(_) => {
                let mut table = self.table.lock().await;
                match table.rooms.get(&room.id) {
                    Some(entry) if !entry.room.is_open() => Ok(entry.room.clone()),
                    _ => {
                        table.rooms.remove(&room.id);
                        info!("⌛ Room {} timed out after {:?} without a guest", room.id, deadline);
                        Err(MatchError::Timeout {
                            room: room.id,
                            waited: deadline,
                        })
                    }
                }
            }
        }
    }

    /// Drops a room whose host stopped waiting. Matched rooms are kept.
    pub async fn abandon(&self, room_id: RoomId) -> bool {
        let mut table = self.table.lock().await;
        let open = table
            .rooms
            .get(&room_id)
            .is_some_and(|entry| entry.room.is_open());
        if open {
            table.rooms.remove(&room_id);
            debug!("Room {} abandoned by its host", room_id);
        }
        open
    }

    /// Removes a room once its game is over.
    pub async fn close(&self, room_id: RoomId) -> Option<Room> {
        let removed = self.table.lock().await.rooms.remove(&room_id);
        if removed.is_some() {
            debug!("Room {} closed", room_id);
        }
        removed.map(|entry| entry.room)
    }

    pub async fn room(&self, room_id: RoomId) -> Option<Room> {
        self.table
            .lock()
            .await
            .rooms
            .get(&room_id)
            .map(|entry| entry.room.clone())
    }

    /// Number of rooms, open or matched.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rooms.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of rooms still waiting for a guest.
    pub async fn open_rooms(&self) -> usize {
        self.table
            .lock()
            .await
            .rooms
            .values()
            .filter(|entry| entry.room.is_open())
            .count()
    }
}
