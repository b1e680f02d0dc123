//! Configuration management for the Reversi server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use crate::cli::CliArgs;
use reversi_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Matchmaking settings
    #[serde(default)]
    pub matchmaking: MatchmakingSettings,
    /// Game session lifecycle settings
    #[serde(default)]
    pub session: SessionSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network binding and connection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// WebSocket handshake timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

/// Default for connection_timeout
pub fn default_connection_timeout() -> u64 {
    60
}

fn default_max_connections() -> usize {
    1000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingSettings {
    /// Seconds a host waits for an opponent before the attempt fails
    #[serde(default = "default_match_timeout")]
    pub match_timeout: u64,
}

fn default_match_timeout() -> u64 {
    120
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            match_timeout: default_match_timeout(),
        }
    }
}

/// Cleanup of games nobody plays any more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Seconds without activity after which a session is dropped (0 to disable)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    /// Seconds between idle checks
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

fn default_idle_timeout() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: default_idle_timeout(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(seconds) = args.match_timeout_secs {
            self.matchmaking.match_timeout = seconds;
        }
    }

    /// Converts the application configuration to a game server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            connection_timeout: Duration::from_secs(self.server.connection_timeout),
            match_timeout: Duration::from_secs(self.matchmaking.match_timeout),
            session_idle_timeout: Duration::from_secs(self.session.idle_timeout),
            sweep_interval: Duration::from_secs(self.session.sweep_interval),
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.server.connection_timeout == 0 {
            return Err("connection_timeout must be at least 1 second".to_string());
        }
        if self.matchmaking.match_timeout == 0 {
            return Err("match_timeout must be at least 1 second".to_string());
        }
        if self.session.idle_timeout > 0 && self.session.sweep_interval == 0 {
            return Err("sweep_interval must be at least 1 second when idle_timeout is set".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.connection_timeout, 60);
        assert_eq!(config.matchmaking.match_timeout, 120);
        assert_eq!(config.session.idle_timeout, 1800);
        assert_eq!(config.session.sweep_interval, 60);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_creates_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert!(path.exists());

        // The written file loads back to the same values.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.matchmaking.match_timeout, config.matchmaking.match_timeout);
        assert_eq!(reloaded.session.idle_timeout, config.session.idle_timeout);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "0.0.0.0:3000"
max_connections = 2000
connection_timeout = 90

[matchmaking]
match_timeout = 45

[session]
idle_timeout = 0
sweep_interval = 10

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.server.max_connections, 2000);
        assert_eq!(config.server.connection_timeout, 90);
        assert_eq!(config.matchmaking.match_timeout, 45);
        assert_eq!(config.session.idle_timeout, 0);
        assert_eq!(config.session.sweep_interval, 10);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:9090"
"#;
        let config: AppConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.connection_timeout, 60);
        assert_eq!(config.matchmaking.match_timeout, 120);
        assert_eq!(config.session.sweep_interval, 60);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.bind_address = "192.168.1.100:8080".to_string();
        config.matchmaking.match_timeout = 30;
        config.session.idle_timeout = 0;

        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.bind_address.to_string(), "192.168.1.100:8080");
        assert_eq!(server_config.max_connections, 1000);
        assert_eq!(server_config.connection_timeout, Duration::from_secs(60));
        assert_eq!(server_config.match_timeout, Duration::from_secs(30));
        assert!(!server_config.idle_sweep_enabled());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            config_path: "config.toml".into(),
            bind_address: Some("0.0.0.0:7000".to_string()),
            log_level: Some("warn".to_string()),
            json_logs: true,
            match_timeout_secs: Some(5),
        };

        config.apply_overrides(&args);

        assert_eq!(config.server.bind_address, "0.0.0.0:7000");
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
        assert_eq!(config.matchmaking.match_timeout, 5);
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid_address".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Invalid bind address"));
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = AppConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().unwrap_err().contains("max_connections"));

        let mut config = AppConfig::default();
        config.matchmaking.match_timeout = 0;
        assert!(config.validate().unwrap_err().contains("match_timeout"));

        let mut config = AppConfig::default();
        config.session.sweep_interval = 0;
        assert!(config.validate().unwrap_err().contains("sweep_interval"));

        // A disabled sweep does not need an interval.
        config.session.idle_timeout = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Level '{}' should be valid", level);
        }

        let mut config = AppConfig::default();
        config.logging.level = "invalid_level".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));
    }
}
