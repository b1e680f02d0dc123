//! Matching endpoint: one `join_room` request, one room assignment.

use super::{close_sink, send_message, ClientConnection, ConnectionContext, WsReceiver, WsStream};
use crate::error::ServerError;
use crate::matchmaking::{Join, MatchError};
use crate::messaging::{decode_client, ClientMessage, ErrorKind, MatchStatus, ServerMessage};
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Serves a matchmaking request.
///
/// A caller matched into an existing room gets `matched` right away. A
/// caller who opens a room gets `waiting`, then `matched` once a guest
/// arrives or a `match_timeout` error when the deadline passes. If the
/// client hangs up while waiting, its room is dropped.
pub async fn handle_matching(
    ws_stream: WsStream,
    client: &ClientConnection,
    context: &ConnectionContext,
) -> Result<(), ServerError> {
    let (mut sink, mut receiver) = ws_stream.split();

    let Some(text) = next_text(&mut receiver).await? else {
        debug!("Connection {} left before asking for a room", client.id);
        return Ok(());
    };
    match decode_client(&text) {
        Ok(ClientMessage::JoinRoom) => {}
        Ok(other) => {
            let error = ServerMessage::error(
                ErrorKind::BadRequest,
                format!("expected join_room, got {}", other.kind()),
            );
            send_message(&mut sink, &error).await?;
            close_sink(&mut sink).await;
            return Ok(());
        }
        Err(e) => {
            send_message(&mut sink, &ServerMessage::error(ErrorKind::BadRequest, e.to_string())).await?;
            close_sink(&mut sink).await;
            return Ok(());
        }
    }

    let reply = match context.rooms.join().await {
        Join::Matched { room, me } => ServerMessage::JoinRoom {
            status: MatchStatus::Matched,
            room,
            me: Some(me),
        },
        Join::Waiting(waiting) => {
            let room_id = waiting.room().id;
            let me = waiting.me();
            let notice = ServerMessage::JoinRoom {
                status: MatchStatus::Waiting,
                room: waiting.room().clone(),
                me: None,
            };
            if let Err(e) = send_message(&mut sink, &notice).await {
                context.rooms.abandon(room_id).await;
                return Err(e);
            }

            let outcome = tokio::select! {
                result = context.rooms.wait_for_guest(waiting, context.match_timeout) => Some(result),
                _ = client_gone(&mut receiver) => None,
            };
            match outcome {
                Some(Ok(room)) => ServerMessage::JoinRoom {
                    status: MatchStatus::Matched,
                    room,
                    me: Some(me),
                },
                Some(Err(e)) => {
                    let kind = match e {
                        MatchError::Timeout { .. } => ErrorKind::MatchTimeout,
                        MatchError::RoomClosed(_) => ErrorKind::UnknownRoom,
                    };
                    ServerMessage::error(kind, e.to_string())
                }
                None => {
                    context.rooms.abandon(room_id).await;
                    info!("🚶 Host {} left room {} before a match", me.id, room_id);
                    return Ok(());
                }
            }
        }
    };

    send_message(&mut sink, &reply).await?;
    close_sink(&mut sink).await;
    Ok(())
}

/// Reads frames until the first text frame. `None` means the client closed.
async fn next_text(receiver: &mut WsReceiver) -> Result<Option<String>, ServerError> {
    while let Some(frame) = receiver.next().await {
        match frame? {
            Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}

/// Resolves once the client closes the connection or the transport fails.
async fn client_gone(receiver: &mut WsReceiver) {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => return,
            Ok(_) => debug!("Ignoring frame sent while waiting for an opponent"),
        }
    }
}
