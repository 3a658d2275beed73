mod config;
mod drive;
mod error;
mod server;
mod telegram;
mod updates;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::drive::DriveClient;
use crate::server::AppState;
use crate::updates::UpdateInfo;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,unistream=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Bind address: {}", config.server.bind_address);
    info!(
        "  Telegram bot token: {}",
        if config.bot_token().is_some() {
            "set"
        } else {
            "missing"
        }
    );
    info!(
        "  Drive API key: {}",
        if config.drive.api_key.is_some() {
            "set"
        } else {
            "missing"
        }
    );

    let (verifier, feed) = telegram::build(&config.telegram)?;
    let drive = DriveClient::new(&config.drive)?;

    let state = Arc::new(AppState {
        verifier,
        feed,
        drive,
        update_info: UpdateInfo::from_config(&config.updates),
        default_feed_limit: config.telegram.default_feed_limit,
    });

    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_address))?;

    info!("{} listening on {}", server::SERVICE_NAME, config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
