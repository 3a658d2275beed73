use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::BotToken;
use crate::error::{Error, Result};
use crate::telegram::types::{TgFile, TgResponse};

/// The two Bot API calls the service depends on.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Raw `getUpdates` records, oldest first. Records are left undecoded so one
    /// unexpected shape cannot fail the whole batch.
    async fn get_updates(&self) -> Result<Vec<Value>>;

    /// `getFile` for a file reference. `None` when the API returned no path.
    async fn get_file_path(&self, file_id: &str) -> Result<Option<String>>;
}

/// Builds `<base>/file/bot<token>/<file_path>`.
///
/// Each component is pushed as its own path segment, so separators or query
/// characters in the token or path cannot change the shape of the URL.
pub fn file_download_url(base: &Url, token: &BotToken, file_path: &str) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::Config("Telegram API base URL cannot hold a path".to_string()))?;
        segments.pop_if_empty();
        segments.push("file");
        segments.push(&format!("bot{}", token.as_str()));
        segments.extend(file_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

/// `<base>/bot<token>/<method>`
pub fn method_url(base: &Url, token: &BotToken, method: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config("Telegram API base URL cannot hold a path".to_string()))?
        .pop_if_empty()
        .push(&format!("bot{}", token.as_str()))
        .push(method);
    Ok(url)
}

/// Bot API over HTTPS
pub struct HttpBotApi {
    client: reqwest::Client,
    api_base: Url,
    token: BotToken,
}

impl HttpBotApi {
    pub fn new(api_base: Url, token: BotToken, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self {
            client,
            api_base,
            token,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = method_url(&self.api_base, &self.token, method)?;

        debug!("Calling Telegram Bot API method {}", method);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::upstream(method, e))?;

        let status = response.status();
        if !status.is_success() {
            let description = response
                .json::<TgResponse<Value>>()
                .await
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_default();
            return Err(Error::Upstream(format!(
                "{} returned {}: {}",
                method, status, description
            )));
        }

        let body: TgResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::upstream(method, e))?;

        if !body.ok {
            return Err(Error::Upstream(format!(
                "{} was rejected: {}",
                method,
                body.description.unwrap_or_default()
            )));
        }

        Ok(body.result)
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn get_updates(&self) -> Result<Vec<Value>> {
        let updates: Option<Vec<Value>> = self.call("getUpdates", &[]).await?;
        Ok(updates.unwrap_or_default())
    }

    async fn get_file_path(&self, file_id: &str) -> Result<Option<String>> {
        let file: Option<TgFile> = self.call("getFile", &[("file_id", file_id)]).await?;
        Ok(file.and_then(|f| f.file_path).filter(|p| !p.is_empty()))
    }
}
