//! Dispatch of play-endpoint messages to the session registry.
//!
//! This is the single place where a decoded [`ClientMessage`] is matched.
//! Errors that concern only the sender (bad frames, illegal moves, unknown
//! rooms) are answered on the sender's own channel and never broadcast.

use crate::connection::{ClientChannel, ConnectionContext};
use crate::error::ServerError;
use crate::messaging::{decode_client, ClientMessage, ErrorKind, ServerMessage};
use crate::registry::{SessionError, Started};
use tracing::{debug, info, warn};

/// Routes one text frame received on a play connection.
///
/// # Arguments
///
/// * `text` - The raw frame, expected to be a JSON client message
/// * `channel` - Outbound channel of the connection that sent the frame
/// * `context` - Shared registries and settings
///
/// # Returns
///
/// `Ok(())` once the message was handled, including when the handling
/// produced an error reply for the client. A frame that does not decode is
/// answered with `bad_request` and reported as a protocol error so the
/// caller can log it; the connection stays usable.
pub async fn route_play_message(
    text: &str,
    channel: &ClientChannel,
    context: &ConnectionContext,
) -> Result<(), ServerError> {
    let message = match decode_client(text) {
        Ok(message) => message,
        Err(e) => {
            reply(channel, ServerMessage::error(ErrorKind::BadRequest, e.to_string()));
            return Err(e.into());
        }
    };
    debug!("📨 {} from connection {}", message.kind(), channel.id());

    match message {
        ClientMessage::JoinRoom => {
            reply(
                channel,
                ServerMessage::error(
                    ErrorKind::BadRequest,
                    "join_room is only accepted on the matching endpoint",
                ),
            );
        }
        ClientMessage::Start { room_id, player } => {
            // Only matched rooms get a session; a host still waiting has no
            // opponent to play against yet.
            let matched = context
                .rooms
                .room(room_id)
                .await
                .is_some_and(|room| !room.is_open());
            if !matched {
                reject(channel, SessionError::UnknownRoom(room_id));
                return Ok(());
            }
            match context.sessions.on_start(room_id, channel.clone()).await {
                Ok(Started::Waiting) => {
                    info!("⏳ Player {} is waiting in room {}", player.id, room_id);
                }
                Ok(Started::Ready(delivery)) => {
                    if !delivery.is_complete() {
                        warn!(
                            "Room {}: ready could not reach {} connection(s)",
                            room_id,
                            delivery.failed.len()
                        );
                    }
                }
                Err(e) => reject(channel, e),
            }
        }
        ClientMessage::Move {
            room_id,
            player,
            x,
            y,
        } => match context.sessions.on_move(room_id, x, y, player).await {
            Ok(report) => {
                if !report.delivery.is_complete() {
                    warn!(
                        "Room {}: move update could not reach {} connection(s)",
                        room_id,
                        report.delivery.failed.len()
                    );
                }
                if report.finished {
                    context.rooms.close(room_id).await;
                }
            }
            Err(e) => {
                debug!("Rejected move ({}, {}) in room {}: {}", x, y, room_id, e);
                reject(channel, e);
            }
        },
    }

    Ok(())
}

fn reject(channel: &ClientChannel, error: SessionError) {
    reply(channel, ServerMessage::error(error.kind(), error.to_string()));
}

fn reply(channel: &ClientChannel, message: ServerMessage) {
    if channel.send(message).is_err() {
        debug!("Connection {} closed before its reply was sent", channel.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::connection::ConnectionId;
    use crate::matchmaking::{Join, Player, RoomRegistry, RoomId};
    use crate::registry::SessionRegistry;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn context() -> ConnectionContext {
        ConnectionContext::new(
            Arc::new(RoomRegistry::new()),
            Arc::new(SessionRegistry::new()),
            &ServerConfig::default(),
        )
    }

    fn connect() -> (ClientChannel, UnboundedReceiver<ServerMessage>) {
        ClientChannel::new(ConnectionId::new())
    }

    async fn matched_room(context: &ConnectionContext) -> (RoomId, Player, Player) {
        let Join::Waiting(waiting) = context.rooms.join().await else {
            panic!("empty registry should open a room");
        };
        let Join::Matched { room, me } = context.rooms.join().await else {
            panic!("second join should match");
        };
        (room.id, waiting.me(), me)
    }

    fn start(room_id: RoomId, player: Player) -> String {
        serde_json::to_string(&ClientMessage::Start { room_id, player }).unwrap()
    }

    fn error_kind(message: Option<ServerMessage>) -> ErrorKind {
        match message {
            Some(ServerMessage::Error { kind, .. }) => kind,
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_frame_gets_bad_request() {
        let context = context();
        let (channel, mut rx) = connect();

        let result = route_play_message("{\"type\":\"shout\"}", &channel, &context).await;
        assert!(matches!(result, Err(ServerError::Protocol(_))));
        assert_eq!(error_kind(rx.try_recv().ok()), ErrorKind::BadRequest);

        route_play_message("{\"type\":\"join_room\"}", &channel, &context)
            .await
            .unwrap();
        assert_eq!(error_kind(rx.try_recv().ok()), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_start_in_unmatched_room_is_rejected() {
        let context = context();
        let (channel, mut rx) = connect();
        let player = Player {
            id: crate::matchmaking::PlayerId(1),
            color: crate::board::Color::Black,
        };

        route_play_message(&start(RoomId(42), player), &channel, &context)
            .await
            .unwrap();
        assert_eq!(error_kind(rx.try_recv().ok()), ErrorKind::UnknownRoom);
        assert!(context.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_start_in_waiting_room_is_rejected() {
        let context = context();
        let Join::Waiting(waiting) = context.rooms.join().await else {
            panic!("empty registry should open a room");
        };
        let room_id = waiting.room().id;
        let (channel, mut rx) = connect();

        route_play_message(&start(room_id, waiting.me()), &channel, &context)
            .await
            .unwrap();
        assert_eq!(error_kind(rx.try_recv().ok()), ErrorKind::UnknownRoom);
        assert!(!context.sessions.contains(room_id));

        // Once the host gives up nothing is left behind.
        assert!(context.rooms.abandon(room_id).await);
        assert!(context.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_illegal_move_answers_only_the_mover() {
        let context = context();
        let (room_id, host, guest) = matched_room(&context).await;
        let (host_channel, mut host_rx) = connect();
        let (guest_channel, mut guest_rx) = connect();

        route_play_message(&start(room_id, host), &host_channel, &context)
            .await
            .unwrap();
        route_play_message(&start(room_id, guest), &guest_channel, &context)
            .await
            .unwrap();
        assert_eq!(host_rx.try_recv().ok(), Some(ServerMessage::Waiting));
        assert_eq!(host_rx.try_recv().ok(), Some(ServerMessage::Ready));
        assert_eq!(guest_rx.try_recv().ok(), Some(ServerMessage::Ready));

        let occupied = serde_json::to_string(&ClientMessage::Move {
            room_id,
            player: host,
            x: 4,
            y: 4,
        })
        .unwrap();
        route_play_message(&occupied, &host_channel, &context)
            .await
            .unwrap();

        assert_eq!(error_kind(host_rx.try_recv().ok()), ErrorKind::IllegalMove);
        assert!(guest_rx.try_recv().is_err());
    }
}
