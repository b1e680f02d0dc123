//! Server module containing the accept loop and background maintenance.

pub mod core;

pub use self::core::GameServer;
