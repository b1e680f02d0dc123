//! # Reversi Server
//!
//! A matchmaking and session server for two-player Reversi (Othello) over
//! WebSocket.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Board Engine** ([`board`]) - 8x8 board inside a sentinel border ring,
//!   move validation, captures, scoring
//! * **Game Session** ([`game`]) - one board plus its lifecycle
//!   (`NotStarted`, `InProgress`, `Finished`)
//! * **Room Registry** ([`matchmaking`]) - pairs players into rooms and wakes
//!   the waiting host when a guest arrives
//! * **Session Registry** ([`registry`]) - runs the game of each matched room
//!   and broadcasts every update to both players
//! * **Transport** ([`connection`], [`server`]) - WebSocket endpoints and the
//!   accept loop
//!
//! ### Message Flow
//!
//! 1. Both players connect to `/matching` and send `join_room`
//! 2. The first is told to wait; both receive `matched` with the room and
//!    their assigned color once the second arrives
//! 3. Both players connect to `/play` and send `start` for their room
//! 4. Each `move` is validated and broadcast as `move_applied` with the full
//!    board; the last one is followed by `finished`
//!
//! ## Turn Order
//!
//! The server does not enforce whose turn it is. The mover's color is taken
//! from the request; only the legality of the placement is checked.
//!
//! ## Error Handling
//!
//! Rule violations and matchmaking failures are reported to the affected
//! client as `error` messages. Transport failures end the connection task
//! with a [`ServerError`].

// Re-export core types and functions for easy access
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::GameServer;
pub use utils::{create_server, create_server_with_config};

pub mod board;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod matchmaking;
pub mod messaging;
pub mod registry;
pub mod server;
pub mod utils;
