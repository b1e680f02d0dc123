//! Core game server implementation.
//!
//! This module contains the `GameServer` struct, which owns the room and
//! session registries, accepts WebSocket connections and runs the idle
//! session sweep.

use crate::{
    config::ServerConfig,
    connection::{handle_connection, ConnectionContext},
    error::ServerError,
    matchmaking::RoomRegistry,
    registry::SessionRegistry,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Backlog passed to `listen(2)`.
const LISTEN_BACKLOG: i32 = 1024;

/// The core game server structure.
///
/// `GameServer` ties the networking layer to the two registries: every
/// accepted connection gets a [`ConnectionContext`] pointing at the shared
/// [`RoomRegistry`] and [`SessionRegistry`].
///
/// # Architecture
///
/// * **Room Registry**: pairs players into rooms on the matching endpoint
/// * **Session Registry**: runs games and fans out updates on the play endpoint
/// * **Connection limit**: a semaphore caps concurrent connections
/// * **Idle sweep**: a background task drops sessions nobody plays in
pub struct GameServer {
    /// Server configuration parameters
    config: ServerConfig,

    /// Matchmaking state
    rooms: Arc<RoomRegistry>,

    /// Live games and their audiences
    sessions: Arc<SessionRegistry>,

    /// One permit per open connection
    connection_limit: Arc<Semaphore>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a new game server with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration parameters
    ///
    /// # Returns
    ///
    /// A new `GameServer` instance with empty registries, ready to start.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));

        Self {
            config,
            rooms: Arc::new(RoomRegistry::new()),
            sessions: Arc::new(SessionRegistry::new()),
            connection_limit,
            shutdown_sender,
        }
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the server started and stopped cleanly, or a `ServerError`
    /// if binding failed.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting Reversi server on {}", self.config.bind_address);
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Creates the listening socket for the configured bind address.
    ///
    /// The socket is set up with `SO_REUSEADDR` so a restarted server can
    /// bind immediately while old connections linger in `TIME_WAIT`.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        if let Err(e) = socket.set_reuse_address(true) {
            warn!("Failed to set SO_REUSEADDR: {}", e);
        }

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to make listener non-blocking: {e}")))?;

        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;
        if let Ok(local) = listener.local_addr() {
            info!("✅ Listening on {}", local);
        }
        Ok(listener)
    }

    /// Runs the accept loop on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let sweeper = self.start_idle_sweep();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.dispatch(stream, addr),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        info!("Server stopped");
        Ok(())
    }

    /// Spawns the task for one accepted connection, subject to the limit.
    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) {
        let permit = match self.connection_limit.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    "Connection limit of {} reached, rejecting {}",
                    self.config.max_connections, addr
                );
                return;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let context = self.connection_context();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = handle_connection(stream, addr, context).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }

    /// Starts the periodic removal of idle sessions.
    ///
    /// Each removed session's room is closed in matchmaking as well. Returns
    /// `None` when the sweep is disabled by configuration.
    fn start_idle_sweep(&self) -> Option<JoinHandle<()>> {
        if !self.config.idle_sweep_enabled() {
            return None;
        }

        let rooms = self.rooms.clone();
        let sessions = self.sessions.clone();
        let max_idle = self.config.session_idle_timeout;
        let period = self.config.sweep_interval;

        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = sessions.sweep_idle(max_idle);
                for room_id in &removed {
                    rooms.close(*room_id).await;
                }
                if !removed.is_empty() {
                    info!("🧹 Removed {} idle session(s)", removed.len());
                }
            }
        }))
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop. Connections already being served run to
    /// completion.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Builds the shared state handed to a connection task.
    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext::new(self.rooms.clone(), self.sessions.clone(), &self.config)
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.config
            .max_connections
            .saturating_sub(self.connection_limit.available_permits())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Gets a reference to the room registry.
    pub fn get_room_registry(&self) -> Arc<RoomRegistry> {
        self.rooms.clone()
    }

    /// Gets a reference to the session registry.
    pub fn get_session_registry(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }
}
