//! WebSocket connection handling.
//!
//! Every accepted TCP stream is upgraded to a WebSocket and bound to one of
//! two endpoints chosen by the request path:
//!
//! * `/matching` - a single `join_room` request answered with the room
//!   assignment, then closed
//! * `/play` - a duplex stream of `start` and `move` requests for one room
//!
//! Any other path is answered with a `bad_request` error and closed.

pub mod client;
pub mod matching;
pub mod play;
pub mod response;

pub use client::ClientConnection;
pub use response::{ClientChannel, Disconnected};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::matchmaking::RoomRegistry;
use crate::messaging::{encode_server, ErrorKind, ServerMessage};
use crate::registry::SessionRegistry;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tracing::{debug, info};
use uuid::Uuid;

/// Type alias for WebSocket stream
pub type WsStream = WebSocketStream<TcpStream>;
/// Type alias for WebSocket sink (outgoing messages)
pub type WsSink = SplitSink<WsStream, Message>;
/// Type alias for WebSocket receiver (incoming messages)
pub type WsReceiver = SplitStream<WsStream>;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The protocol a connection speaks, picked by its request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Matching,
    Play,
}

impl Endpoint {
    pub const MATCHING_PATH: &'static str = "/matching";
    pub const PLAY_PATH: &'static str = "/play";

    /// Maps a request path to an endpoint. A trailing slash is ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        match trimmed {
            Self::MATCHING_PATH => Some(Endpoint::Matching),
            Self::PLAY_PATH => Some(Endpoint::Play),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Matching => f.write_str("matching"),
            Endpoint::Play => f.write_str("play"),
        }
    }
}

/// Shared state handed to every connection task.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub rooms: Arc<RoomRegistry>,
    pub sessions: Arc<SessionRegistry>,
    /// Deadline for a host waiting on the matching endpoint
    pub match_timeout: Duration,
    /// Deadline for the WebSocket handshake
    pub handshake_timeout: Duration,
}

impl ConnectionContext {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        sessions: Arc<SessionRegistry>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            rooms,
            sessions,
            match_timeout: config.match_timeout,
            handshake_timeout: config.connection_timeout,
        }
    }
}

/// Handles a single client connection from handshake to close.
///
/// # Arguments
///
/// * `stream` - The accepted TCP stream
/// * `addr` - The client's socket address
/// * `context` - Shared registries and timeouts
///
/// # Returns
///
/// `Ok(())` when the connection ended normally, or a `ServerError` if the
/// handshake or the transport failed.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    context: ConnectionContext,
) -> Result<(), ServerError> {
    let mut path = String::new();
    let handshake = accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            path = request.uri().path().to_owned();
            Ok(response)
        },
    );
    let ws_stream = tokio::time::timeout(context.handshake_timeout, handshake)
        .await
        .map_err(|_| ServerError::Network(format!("WebSocket handshake with {addr} timed out")))??;

    let Some(endpoint) = Endpoint::from_path(&path) else {
        info!("❓ Connection from {} asked for unknown path {}", addr, path);
        let (mut sink, _) = ws_stream.split();
        let error = ServerMessage::error(ErrorKind::BadRequest, format!("unknown endpoint {path}"));
        send_message(&mut sink, &error).await?;
        close_sink(&mut sink).await;
        return Ok(());
    };

    let client = ClientConnection::new(addr, endpoint);
    info!(
        "🔗 Connection {} from {} on {}",
        client.id, client.remote_addr, client.endpoint
    );

    let result = match client.endpoint {
        Endpoint::Matching => matching::handle_matching(ws_stream, &client, &context).await,
        Endpoint::Play => play::handle_play(ws_stream, &client, &context).await,
    };

    info!(
        "👋 Connection {} from {} on {} closed after {:?}",
        client.id,
        client.remote_addr,
        client.endpoint,
        client.uptime()
    );
    result
}

/// Encodes and sends one server message.
pub(crate) async fn send_message(sink: &mut WsSink, message: &ServerMessage) -> Result<(), ServerError> {
    let text = encode_server(message)?;
    sink.send(Message::text(text)).await?;
    Ok(())
}

/// Sends a close frame, ignoring a peer that is already gone.
pub(crate) async fn close_sink(sink: &mut WsSink) {
    if let Err(e) = sink.close().await {
        debug!("Close handshake failed: {}", e);
    }
}
