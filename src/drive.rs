use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DriveConfig;
use crate::error::{Error, Result};

const FILE_FIELDS: &str = "files(id,name,mimeType,webViewLink,thumbnailLink)";

/// Google Drive folder listing with an API key (public folders only).
pub struct DriveClient {
    client: reqwest::Client,
    files_url: Url,
    api_key: Option<String>,
}

/// A Drive file as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    web_view_link: Option<String>,
    thumbnail_link: Option<String>,
}

impl From<RawFile> for DriveFile {
    fn from(raw: RawFile) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            mime_type: raw.mime_type,
            url: raw.web_view_link,
            thumbnail: raw.thumbnail_link,
        }
    }
}

/// `'<folder>' in parents and trashed=false`, with the id escaped for the
/// Drive query language.
fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed=false", escaped)
}

/// `<base>/files`, keeping any path already on the base.
fn files_url(api_base: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(api_base)
        .with_context(|| format!("Invalid Drive API base URL: {}", api_base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Drive API base URL cannot hold a path: {}", api_base))?
        .pop_if_empty()
        .push("files");
    Ok(url)
}

impl DriveClient {
    pub fn new(config: &DriveConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build Drive HTTP client")?;
        Ok(Self {
            client,
            files_url: files_url(&config.api_base_url)?,
            api_key: config.api_key.clone(),
        })
    }

    pub async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("drive api key is not set".to_string()))?;

        let query = folder_query(folder_id);

        debug!("Listing Drive folder {}", folder_id);

        let response = self
            .client
            .get(self.files_url.clone())
            .query(&[("q", query.as_str()), ("fields", FILE_FIELDS), ("key", api_key)])
            .send()
            .await
            .map_err(|e| Error::upstream("drive files.list", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "drive files.list returned {}",
                status
            )));
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| Error::upstream("drive files.list", e))?;

        Ok(list.files.into_iter().map(DriveFile::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_folder_query() {
        assert_eq!(
            folder_query("1AbC"),
            "'1AbC' in parents and trashed=false"
        );
    }

    #[test]
    fn test_folder_query_escapes_quotes() {
        assert_eq!(
            folder_query("x' or name contains 'y"),
            "'x\\' or name contains \\'y' in parents and trashed=false"
        );
        assert_eq!(folder_query("a\\b"), "'a\\\\b' in parents and trashed=false");
    }

    #[test]
    fn test_files_url() {
        assert_eq!(
            files_url("https://www.googleapis.com/drive/v3").unwrap().as_str(),
            "https://www.googleapis.com/drive/v3/files"
        );
        assert_eq!(
            files_url("http://localhost:9000/drive/v3/").unwrap().as_str(),
            "http://localhost:9000/drive/v3/files"
        );
        assert!(files_url("not a url").is_err());
    }

    #[test]
    fn test_file_list_mapping() {
        let list: FileList = serde_json::from_value(json!({
            "files": [{
                "id": "f1",
                "name": "song.mp3",
                "mimeType": "audio/mpeg",
                "webViewLink": "https://drive.google.com/file/d/f1/view",
                "thumbnailLink": "https://lh3.googleusercontent.com/t"
            }, { "id": "f2" }]
        }))
        .unwrap();
        let files: Vec<DriveFile> = list.files.into_iter().map(DriveFile::from).collect();
        assert_eq!(files.len(), 2);
        assert_eq!(
            serde_json::to_value(&files[0]).unwrap(),
            json!({
                "id": "f1",
                "name": "song.mp3",
                "mimeType": "audio/mpeg",
                "url": "https://drive.google.com/file/d/f1/view",
                "thumbnail": "https://lh3.googleusercontent.com/t"
            })
        );
        assert_eq!(files[1].name, None);
    }

    #[test]
    fn test_empty_listing() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let config = DriveConfig {
            api_key: None,
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            request_timeout_secs: 1,
        };
        let client = DriveClient::new(&config).unwrap();
        let err = client.list_folder("folder").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
