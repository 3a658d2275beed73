use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use crate::config::BotToken;
use crate::error::{Error, Result};
use crate::telegram::client::{file_download_url, BotApi};

/// Exchanges a file reference for a durable download URL.
///
/// Nothing is cached: every call is one `getFile` round trip.
#[derive(Clone)]
pub struct MediaResolver {
    api: Arc<dyn BotApi>,
    file_base: Url,
    token: BotToken,
}

impl MediaResolver {
    pub fn new(api: Arc<dyn BotApi>, file_base: Url, token: BotToken) -> Self {
        Self {
            api,
            file_base,
            token,
        }
    }

    pub async fn resolve(&self, file_id: &str) -> Result<String> {
        let path = self
            .api
            .get_file_path(file_id)
            .await?
            .ok_or_else(|| Error::Resolution(format!("no file path for {}", file_id)))?;

        debug!("Resolved file {} to {}", file_id, path);

        let url = file_download_url(&self.file_base, &self.token, &path)?;
        Ok(url.into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory Bot API: fixed updates, a file_id → path table, optional
    /// per-file latency and a call log.
    #[derive(Default)]
    pub(crate) struct FakeBotApi {
        pub updates: Vec<Value>,
        pub files: HashMap<String, String>,
        pub fail_files: Vec<String>,
        pub fail_updates: bool,
        pub delays: HashMap<String, Duration>,
        pub file_calls: Mutex<Vec<String>>,
    }

    impl FakeBotApi {
        pub fn with_file(mut self, file_id: &str, path: &str) -> Self {
            self.files.insert(file_id.to_string(), path.to_string());
            self
        }

        pub fn with_delay(mut self, file_id: &str, delay: Duration) -> Self {
            self.delays.insert(file_id.to_string(), delay);
            self
        }

        pub fn file_calls(&self) -> Vec<String> {
            self.file_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BotApi for FakeBotApi {
        async fn get_updates(&self) -> Result<Vec<Value>> {
            if self.fail_updates {
                return Err(Error::Upstream("getUpdates returned 502".to_string()));
            }
            Ok(self.updates.clone())
        }

        async fn get_file_path(&self, file_id: &str) -> Result<Option<String>> {
            self.file_calls.lock().unwrap().push(file_id.to_string());
            if let Some(delay) = self.delays.get(file_id) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail_files.iter().any(|f| f == file_id) {
                return Err(Error::Upstream("getFile: timed out".to_string()));
            }
            Ok(self.files.get(file_id).cloned())
        }
    }

    pub(crate) fn resolver(api: Arc<FakeBotApi>) -> MediaResolver {
        MediaResolver::new(
            api,
            Url::parse("https://api.telegram.org").unwrap(),
            BotToken::new("123:ABC"),
        )
    }

    #[tokio::test]
    async fn test_resolve_builds_download_url() {
        let api = Arc::new(FakeBotApi::default().with_file("f1", "photos/file_1.jpg"));
        let url = resolver(api.clone()).resolve("f1").await.unwrap();
        assert_eq!(url, "https://api.telegram.org/file/bot123:ABC/photos/file_1.jpg");
        assert_eq!(api.file_calls(), vec!["f1"]);
    }

    #[tokio::test]
    async fn test_missing_path_is_resolution_error() {
        let api = Arc::new(FakeBotApi::default());
        let err = resolver(api).resolve("unknown").await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_passes_through() {
        let api = Arc::new(FakeBotApi {
            fail_files: vec!["f1".to_string()],
            ..Default::default()
        });
        let err = resolver(api).resolve("f1").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn test_same_reference_is_resolved_each_time() {
        let api = Arc::new(FakeBotApi::default().with_file("f1", "photos/a.jpg"));
        let resolver = resolver(api.clone());
        resolver.resolve("f1").await.unwrap();
        resolver.resolve("f1").await.unwrap();
        assert_eq!(api.file_calls().len(), 2);
    }
}
