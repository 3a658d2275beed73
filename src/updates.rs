use serde::Serialize;

use crate::config::UpdatesConfig;

/// Client update check. No release feed is consulted; the answer comes from
/// `[updates]` and never reports an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub latest_version: String,
    pub update_available: bool,
    pub notes: String,
}

impl UpdateInfo {
    pub fn from_config(config: &UpdatesConfig) -> Self {
        Self {
            latest_version: config.latest_version.clone(),
            update_available: false,
            notes: config.notes.clone(),
        }
    }
}
