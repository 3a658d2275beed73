pub mod client;
pub mod feed;
pub mod login;
pub mod media;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::telegram::client::HttpBotApi;
use crate::telegram::feed::ChannelFeed;
use crate::telegram::login::LoginVerifier;
use crate::telegram::media::MediaResolver;

/// Build the login verifier and channel feed from `[telegram]`.
///
/// A missing bot token is not a startup failure: both services are built
/// unconfigured and report it per request.
pub fn build(config: &TelegramConfig) -> Result<(LoginVerifier, ChannelFeed)> {
    let verifier = LoginVerifier::new(config.bot_token.as_ref());

    let Some(token) = config.bot_token.clone() else {
        warn!("No Telegram bot token configured; Telegram routes will fail");
        return Ok((verifier, ChannelFeed::unconfigured()));
    };

    let api_base = Url::parse(&config.api_base_url)
        .with_context(|| format!("Invalid Telegram API base URL: {}", config.api_base_url))?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let api = Arc::new(HttpBotApi::new(api_base.clone(), token.clone(), timeout)?);
    let resolver = MediaResolver::new(api.clone(), api_base, token);

    info!(
        "Telegram Bot API at {} (timeout {}s)",
        config.api_base_url, config.request_timeout_secs
    );
    Ok((verifier, ChannelFeed::new(api, resolver)))
}
