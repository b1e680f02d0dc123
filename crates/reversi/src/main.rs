//! Main application entry point for the Reversi server.
//!
//! Parses the command line, loads the TOML configuration, sets up logging
//! and runs the server until a shutdown signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use cli::CliArgs;
use config::AppConfig;
use reversi_server::GameServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the accept loop gets to stop after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main application struct.
pub struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
}

impl Application {
    /// Loads configuration, installs logging and builds the server.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration first (before logging setup)
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_overrides(&args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {}", e).into());
        }

        logging::setup_logging(&config.logging)?;
        display_banner();

        let server = Arc::new(GameServer::new(config.to_server_config()?));
        info!("📂 Config: {}", args.config_path.display());

        Ok(Self { config, server })
    }

    /// Runs the server until a shutdown signal arrives or the server fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  ⏱️ Handshake timeout: {}s", self.config.server.connection_timeout);
        info!("  ⌛ Match timeout: {}s", self.config.matchmaking.match_timeout);
        if self.config.session.idle_timeout == 0 {
            info!("  🧹 Idle session sweep: disabled");
        } else {
            info!(
                "  🧹 Idle sessions dropped after {}s (checked every {}s)",
                self.config.session.idle_timeout, self.config.session.sweep_interval
            );
        }

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        info!("✅ Reversi server is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            signal = signals::wait_for_shutdown() => {
                let signal = signal?;
                info!("📡 Received {}, initiating graceful shutdown...", signal);
            }
            finished = &mut server_handle => {
                return match finished {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(e.into()),
                };
            }
        }

        self.server.shutdown().await?;
        match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => warn!("Server did not stop within {:?}", SHUTDOWN_GRACE),
        }

        info!(
            "👋 Reversi server stopped with {} connection(s) still open",
            self.server.active_connections()
        );
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Display startup banner using proper logging
fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════════╗");
    info!("║             ⚫ REVERSI SERVER ⚪          ║");
    info!("║                  v{:<8}               ║", version);
    info!("╚══════════════════════════════════════════╝");
}
