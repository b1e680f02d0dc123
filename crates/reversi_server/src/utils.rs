//! Convenience constructors for the game server.

use crate::{config::ServerConfig, server::GameServer};

/// Creates a server listening on the default address with default timeouts.
pub fn create_server() -> GameServer {
    create_server_with_config(ServerConfig::default())
}

/// Creates a server with the given configuration.
pub fn create_server_with_config(config: ServerConfig) -> GameServer {
    GameServer::new(config)
}
