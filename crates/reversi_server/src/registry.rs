//! Live game sessions and the connections watching them.
//!
//! Every matched room gets a `RoomSession` the first time one of its
//! players sends `start`. The session owns the [`Game`] and the outbound
//! channels of the (at most two) connections in the room.
//!
//! # Locking
//!
//! Sessions are stored in a [`DashMap`] of per-room mutexes. Applying a move
//! and broadcasting its result happen under the room's own mutex, so two
//! moves in one room never interleave while moves in different rooms never
//! wait on each other.
//!
//! # Delivery
//!
//! A broadcast attempts every channel in the room. Channels whose
//! connection has gone away are dropped from the room and reported in the
//! returned [`Delivery`]; the remaining channels still get the message.
//!
//! # Teardown
//!
//! A finished or swept session is marked closed before it leaves the map,
//! and its room id is remembered for [`RETIRED_RETENTION`]. A `start` that
//! races with the teardown therefore sees either the closed session or the
//! retired id and never opens a fresh game in the old room.

use crate::board::IllegalMove;
use crate::connection::{ClientChannel, ConnectionId, Disconnected};
use crate::game::Game;
use crate::matchmaking::{Player, RoomId};
use crate::messaging::{ErrorKind, ServerMessage};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Maximum number of connections that can start in one room.
pub const ROOM_CAPACITY: usize = 2;

/// How long the id of a torn-down room keeps rejecting `start`.
pub const RETIRED_RETENTION: Duration = Duration::from_secs(60);

/// Errors reported to the connection that issued a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("room {0} has no active game")]
    UnknownRoom(RoomId),
    #[error("room {0} already has two players")]
    RoomFull(RoomId),
    #[error("this connection already started in room {0}")]
    AlreadyJoined(RoomId),
    #[error(transparent)]
    IllegalMove(#[from] IllegalMove),
}

impl SessionError {
    /// Error category sent to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::UnknownRoom(_) => ErrorKind::UnknownRoom,
            SessionError::RoomFull(_) => ErrorKind::RoomFull,
            SessionError::AlreadyJoined(_) => ErrorKind::AlreadyJoined,
            SessionError::IllegalMove(_) => ErrorKind::IllegalMove,
        }
    }
}

/// Outcome of one or more broadcasts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Number of successful sends.
    pub delivered: usize,
    /// Connections that could not be reached and were removed from the room.
    pub failed: Vec<ConnectionId>,
}

impl Delivery {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: Delivery) {
        self.delivered += other.delivered;
        self.failed.extend(other.failed);
    }
}

/// What a `start` led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Started {
    /// The caller is alone in the room and was told to wait.
    Waiting,
    /// Both sides are present; `ready` was broadcast.
    Ready(Delivery),
}

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// The move ended the game and `finished` was broadcast.
    pub finished: bool,
    pub delivery: Delivery,
}

/// Game state and audience of one room.
#[derive(Debug)]
struct RoomSession {
    game: Game,
    channels: Vec<ClientChannel>,
    last_activity: Instant,
    closed: bool,
}

impl RoomSession {
    fn new() -> Self {
        Self {
            game: Game::new(),
            channels: Vec::with_capacity(ROOM_CAPACITY),
            last_activity: Instant::now(),
            closed: false,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn broadcast(&mut self, message: &ServerMessage) -> Delivery {
        let mut delivery = Delivery::default();
        self.channels
            .retain(|channel| match channel.send(message.clone()) {
                Ok(()) => {
                    delivery.delivered += 1;
                    true
                }
                Err(Disconnected(id)) => {
                    delivery.failed.push(id);
                    false
                }
            });
        delivery
    }

    fn close(&mut self) {
        self.closed = true;
        self.channels.clear();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }
}

/// Registry of all live sessions, keyed by room.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<RoomId, Arc<Mutex<RoomSession>>>,
    /// Rooms whose session was torn down, with the time it happened.
    retired: DashMap<RoomId, Instant>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `channel` to the room's audience, creating the session if needed.
    ///
    /// The second distinct connection to start flips the game to in-progress
    /// and `ready` is broadcast to both. The first one receives `waiting`.
    /// Channels whose connection has already closed are dropped before the
    /// capacity check, so a player can reconnect and start again.
    ///
    /// # Errors
    ///
    /// * `AlreadyJoined` if this connection already started in the room
    /// * `RoomFull` if two live connections are already present
    /// * `UnknownRoom` if the room's game already finished or was swept
    pub async fn on_start(
        &self,
        room_id: RoomId,
        channel: ClientChannel,
    ) -> Result<Started, SessionError> {
        let session = match self.sessions.entry(room_id) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                if self.retired.contains_key(&room_id) {
                    return Err(SessionError::UnknownRoom(room_id));
                }
                entry
                    .insert(Arc::new(Mutex::new(RoomSession::new())))
                    .value()
                    .clone()
            }
        };
        let mut guard = session.lock().await;
        let session = &mut *guard;

        if session.closed {
            return Err(SessionError::UnknownRoom(room_id));
        }
        if session.channels.iter().any(|c| c.id() == channel.id()) {
            return Err(SessionError::AlreadyJoined(room_id));
        }
        session.channels.retain(ClientChannel::is_open);
        if session.channels.len() >= ROOM_CAPACITY {
            return Err(SessionError::RoomFull(room_id));
        }

        debug!("Connection {} started in room {}", channel.id(), room_id);
        session.channels.push(channel.clone());
        session.touch();

        if session.channels.len() == ROOM_CAPACITY {
            session.game.start();
            let delivery = session.broadcast(&ServerMessage::Ready);
            info!("🎮 Room {} is ready, game in progress", room_id);
            return Ok(Started::Ready(delivery));
        }

        if channel.send(ServerMessage::Waiting).is_err() {
            session.channels.retain(|c| c.id() != channel.id());
        }
        Ok(Started::Waiting)
    }

    /// Applies a move in the room and broadcasts the result.
    ///
    /// On success every channel in the room receives `move_applied` with the
    /// full board. If the move ended the game, `finished` follows and the
    /// session is removed from the registry. A rejected move changes nothing
    /// and nothing is broadcast.
    pub async fn on_move(
        &self,
        room_id: RoomId,
        x: i32,
        y: i32,
        player: Player,
    ) -> Result<MoveReport, SessionError> {
        let handle = self
            .sessions
            .get(&room_id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::UnknownRoom(room_id))?;
        let mut guard = handle.lock().await;
        let session = &mut *guard;

        if session.closed {
            return Err(SessionError::UnknownRoom(room_id));
        }

        let finished = session.game.apply_move(x, y, player.color)?;
        session.touch();
        debug!(
            "Room {}: {} played ({}, {})\n{}",
            room_id, player.color, x, y, session.game.board()
        );

        let applied = ServerMessage::MoveApplied {
            mover: player,
            x,
            y,
            board: session.game.board().snapshot(),
        };
        let mut delivery = session.broadcast(&applied);

        if finished {
            let outcome = ServerMessage::Finished {
                winner: session.game.winner().winner(),
                score: session.game.score(),
                board: session.game.board().snapshot(),
            };
            delivery.merge(session.broadcast(&outcome));
            session.close();
            drop(guard);

            let now = Instant::now();
            self.retired.insert(room_id, now);
            self.sessions
                .remove_if(&room_id, |_, current| Arc::ptr_eq(current, &handle));
            self.prune_retired(now);
            info!("🏁 Room {} finished, session removed", room_id);
        }

        Ok(MoveReport { finished, delivery })
    }

    /// Removes sessions that saw no activity for at least `max_idle`.
    ///
    /// Sessions that are busy right now are skipped, and idleness is checked
    /// again under the session's lock right before removal. Connections in a
    /// swept room are told with an `unknown_room` error. Returns the ids of
    /// the removed rooms.
    pub fn sweep_idle(&self, max_idle: Duration) -> Vec<RoomId> {
        let now = Instant::now();
        let candidates: Vec<RoomId> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .is_ok_and(|session| session.idle_for(now) >= max_idle)
            })
            .map(|entry| *entry.key())
            .collect();

        let mut removed = Vec::with_capacity(candidates.len());
        for room_id in candidates {
            let swept = self.sessions.remove_if(&room_id, |_, handle| {
                let Ok(mut session) = handle.try_lock() else {
                    return false;
                };
                if session.idle_for(now) < max_idle {
                    return false;
                }
                let notice = ServerMessage::error(
                    ErrorKind::UnknownRoom,
                    format!("room {room_id} was closed after {max_idle:?} without activity"),
                );
                let delivery = session.broadcast(&notice);
                debug!("Room {}: idle notice reached {} connection(s)", room_id, delivery.delivered);
                session.close();
                self.retired.insert(room_id, now);
                true
            });
            match swept {
                Some(_) => removed.push(room_id),
                None => debug!("Room {} became active again, keeping it", room_id),
            }
        }

        self.prune_retired(now);
        removed
    }

    fn prune_retired(&self, now: Instant) {
        self.retired
            .retain(|_, retired_at| now.saturating_duration_since(*retired_at) < RETIRED_RETENTION);
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.sessions.contains_key(&room_id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
