//! Play endpoint: duplex stream of `start` and `move` requests.
//!
//! Incoming frames are routed on the connection task. Outgoing messages,
//! whether replies to this client or broadcasts from the room, go through
//! the connection's [`ClientChannel`] and are written by a dedicated task.
//! The connection closes after `finished` has been written.

use super::{close_sink, send_message, ClientChannel, ClientConnection, ConnectionContext, WsSink, WsStream};
use crate::error::ServerError;
use crate::messaging::{route_play_message, ErrorKind, ServerMessage};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

/// Serves a game-play connection until either side closes it.
pub async fn handle_play(
    ws_stream: WsStream,
    client: &ClientConnection,
    context: &ConnectionContext,
) -> Result<(), ServerError> {
    let (sink, mut receiver) = ws_stream.split();
    let (channel, outbound) = ClientChannel::new(client.id);
    let mut writer = tokio::spawn(write_outbound(sink, outbound));

    let result: Result<(), ServerError> = loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = route_play_message(text.as_str(), &channel, context).await {
                        debug!("Connection {}: {}", client.id, e);
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    let reply = ServerMessage::error(ErrorKind::BadRequest, "binary frames are not supported");
                    if channel.send(reply).is_err() {
                        break Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error for connection {}: {}", client.id, e);
                    break Err(e.into());
                }
            },
            written = &mut writer => {
                match written {
                    Ok(Ok(())) => debug!("Connection {} finished its game", client.id),
                    Ok(Err(e)) => warn!("Writer for connection {} failed: {}", client.id, e),
                    Err(e) => error!("Writer task for connection {} panicked: {}", client.id, e),
                }
                return Ok(());
            }
        }
    };

    writer.abort();
    result
}

/// Drains the connection's queue into the socket.
///
/// Stops after a terminal message, closing the socket, or when every
/// sender is gone.
async fn write_outbound(
    mut sink: WsSink,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<(), ServerError> {
    while let Some(message) = outbound.recv().await {
        send_message(&mut sink, &message).await?;
        if message.is_terminal() {
            break;
        }
    }
    close_sink(&mut sink).await;
    Ok(())
}
