use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides `[telegram] bot_token`.
pub const BOT_TOKEN_ENV: &str = "UNISTREAM_TELEGRAM_BOT_TOKEN";

/// Telegram bot token. Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BotToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    #[serde(default = "default_telegram_config")]
    pub telegram: TelegramConfig,
    #[serde(default = "default_drive_config")]
    pub drive: DriveConfig,
    #[serde(default = "default_updates_config")]
    pub updates: UpdatesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Shared by login verification and the channel feed. Absent means every
    /// Telegram route answers with a configuration error.
    #[serde(default)]
    pub bot_token: Option<BotToken>,
    #[serde(default = "default_telegram_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_feed_limit")]
    pub default_feed_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_drive_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdatesConfig {
    #[serde(default = "default_latest_version")]
    pub latest_version: String,
    #[serde(default = "default_update_notes")]
    pub notes: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_feed_limit() -> usize {
    20
}

fn default_drive_api_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_latest_version() -> String {
    "1.0.0".to_string()
}

fn default_update_notes() -> String {
    "No updates configured".to_string()
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind_address: default_bind_address(),
    }
}

fn default_telegram_config() -> TelegramConfig {
    TelegramConfig {
        bot_token: None,
        api_base_url: default_telegram_api_url(),
        request_timeout_secs: default_request_timeout_secs(),
        default_feed_limit: default_feed_limit(),
    }
}

fn default_drive_config() -> DriveConfig {
    DriveConfig {
        api_key: None,
        api_base_url: default_drive_api_url(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_updates_config() -> UpdatesConfig {
    UpdatesConfig {
        latest_version: default_latest_version(),
        notes: default_update_notes(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server_config(),
            telegram: default_telegram_config(),
            drive: default_drive_config(),
            updates: default_updates_config(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_token_override(std::env::var(BOT_TOKEN_ENV).ok());

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// A non-empty override replaces whatever the file configured.
    fn apply_token_override(&mut self, value: Option<String>) {
        if let Some(token) = value.map(BotToken::new).filter(|t| !t.is_blank()) {
            self.telegram.bot_token = Some(token);
        }
    }

    fn normalize(&mut self) {
        if self.telegram.bot_token.as_ref().is_some_and(BotToken::is_blank) {
            self.telegram.bot_token = None;
        }
        if self.drive.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.drive.api_key = None;
        }
    }

    pub fn bot_token(&self) -> Option<&BotToken> {
        self.telegram.bot_token.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(config.bot_token().is_none());
        assert_eq!(config.telegram.api_base_url, "https://api.telegram.org");
        assert_eq!(config.telegram.request_timeout_secs, 20);
        assert_eq!(config.telegram.default_feed_limit, 20);
        assert_eq!(config.updates.latest_version, "1.0.0");
        assert!(config.drive.api_key.is_none());
        assert_eq!(config.drive.request_timeout_secs, 20);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
[server]
bind_address = "127.0.0.1:9000"

[telegram]
bot_token = "123:ABC"
api_base_url = "http://localhost:8081"
request_timeout_secs = 5
default_feed_limit = 10

[drive]
api_key = "drive-key"
request_timeout_secs = 8

[updates]
latest_version = "2.1.0"
notes = "Bug fixes"
"#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.bot_token().unwrap().as_str(), "123:ABC");
        assert_eq!(config.telegram.api_base_url, "http://localhost:8081");
        assert_eq!(config.telegram.request_timeout_secs, 5);
        assert_eq!(config.telegram.default_feed_limit, 10);
        assert_eq!(config.drive.api_key.as_deref(), Some("drive-key"));
        assert_eq!(config.drive.request_timeout_secs, 8);
        assert_eq!(config.updates.notes, "Bug fixes");
    }

    #[test]
    fn test_blank_token_is_absent() {
        let config = Config::from_toml_str("[telegram]\nbot_token = \"  \"\n").unwrap();
        assert!(config.bot_token().is_none());
    }

    #[test]
    fn test_token_override() {
        let mut config = Config::from_toml_str("[telegram]\nbot_token = \"file\"\n").unwrap();
        config.apply_token_override(Some(String::new()));
        assert_eq!(config.bot_token().unwrap().as_str(), "file");
        config.apply_token_override(Some("env".to_string()));
        assert_eq!(config.bot_token().unwrap().as_str(), "env");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let config = Config::from_toml_str("[telegram]\nbot_token = \"123:SECRET\"\n").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("<redacted>"));
    }
}
