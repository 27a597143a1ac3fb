//! chirpy - A small social network API
//!
//! This is the main entry point for the chirpy server.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use chirpy::auth::{AuthConfig, AuthManager};
use chirpy::config::Config;
use chirpy::database::SqliteDatabase;
use chirpy::error::AppError;
use chirpy::logging::init_tracing;
use chirpy::server::{AppState, Server};

/// chirpy - A small social network API
#[derive(Parser, Debug)]
#[command(name = "chirpy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "CHIRPY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    run(args).await.map_err(Into::into)
}

async fn run(args: Args) -> Result<(), AppError> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    let config = load_config(&args)?;
    config.validate()?;

    init_tracing(&config.logging.level, &config.logging.format)?;

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = %config.platform,
        "Starting chirpy"
    );
    if config.is_dev() {
        warn!("Dev platform: /admin/reset can delete every user");
    }

    let database = Arc::new(SqliteDatabase::new(&config.database.path).await?);
    info!(path = %config.database.path, "Database initialized");

    let auth_config = AuthConfig::from(&config.auth);
    if auth_config.polka_key.is_none() {
        warn!("No Polka API key configured, webhooks will be rejected");
    }
    let auth_manager = Arc::new(AuthManager::new(Arc::clone(&database), auth_config));

    let state = AppState::new(
        auth_manager,
        database,
        config.platform.clone(),
        config.server.filepath_root.clone(),
    );

    let server = Server::bind(&config.server, state).await?;
    info!(
        addr = %server.local_addr()?,
        filepath_root = %config.server.filepath_root,
        "Starting HTTP server"
    );

    server.serve(shutdown_signal()).await?;

    info!("chirpy shutdown complete");
    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> Result<Config, AppError> {
    let config = match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path)?
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Config::from_env()?
        }
    };
    Ok(config)
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
