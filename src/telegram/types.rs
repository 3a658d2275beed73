//! Bot API deserialization types, limited to what the channel feed reads.
//!
//! Every field is optional: `getUpdates` mixes many update kinds and a channel
//! post may lack any of these.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TgResponse<T> {
    #[serde(default)]
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[allow(dead_code)]
pub struct TgUpdate {
    #[serde(default)]
    pub update_id: i64,
    pub channel_post: Option<TgChannelPost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TgChannelPost {
    #[serde(default)]
    pub message_id: i64,
    pub chat: Option<TgChat>,
    /// Unix seconds
    pub date: Option<i64>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub video: Option<TgVideo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[allow(dead_code)]
pub struct TgChat {
    #[serde(default)]
    pub id: i64,
    pub username: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct TgPhotoSize {
    /// Optional so a broken descriptor degrades its post instead of dropping it
    pub file_id: Option<String>,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgVideo {
    pub file_id: Option<String>,
    pub thumbnail: Option<TgPhotoSize>,
    /// Name used before Bot API 6.6
    pub thumb: Option<TgPhotoSize>,
}

impl TgVideo {
    pub fn thumbnail(&self) -> Option<&TgPhotoSize> {
        self.thumbnail.as_ref().or(self.thumb.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgFile {
    pub file_path: Option<String>,
}

impl TgChannelPost {
    pub fn chat_username(&self) -> Option<&str> {
        self.chat.as_ref()?.username.as_deref()
    }

    pub fn chat_title(&self) -> Option<&str> {
        self.chat.as_ref()?.title.as_deref()
    }

    /// Caption wins over text; empty strings count as absent.
    pub fn body(&self) -> &str {
        [self.caption.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_video_with_legacy_thumb() {
        let post: TgChannelPost = serde_json::from_value(serde_json::json!({
            "message_id": 7,
            "chat": { "id": -100, "username": "news", "title": "News", "type": "channel" },
            "date": 1700000000,
            "video": { "file_id": "vid", "duration": 3, "thumb": { "file_id": "th", "width": 90, "height": 90 } }
        }))
        .unwrap();
        assert_eq!(post.chat_username(), Some("news"));
        assert_eq!(post.chat_title(), Some("News"));
        let video = post.video.unwrap();
        assert_eq!(video.file_id.as_deref(), Some("vid"));
        assert_eq!(video.thumbnail().unwrap().file_id.as_deref(), Some("th"));
    }

    #[test]
    fn test_body_prefers_caption() {
        let post = TgChannelPost {
            caption: Some("cap".into()),
            text: Some("txt".into()),
            ..Default::default()
        };
        assert_eq!(post.body(), "cap");

        let post = TgChannelPost {
            caption: Some(String::new()),
            text: Some("txt".into()),
            ..Default::default()
        };
        assert_eq!(post.body(), "txt");

        assert_eq!(TgChannelPost::default().body(), "");
    }

    #[test]
    fn test_photo_size_without_file_id_still_decodes() {
        let post: TgChannelPost = serde_json::from_value(serde_json::json!({
            "message_id": 2,
            "photo": [{ "width": 1 }]
        }))
        .unwrap();
        assert_eq!(post.photo.unwrap()[0].file_id, None);
    }

    #[test]
    fn test_update_without_channel_post() {
        let update: TgUpdate =
            serde_json::from_str(r#"{"update_id": 1, "message": {"message_id": 2}}"#).unwrap();
        assert!(update.channel_post.is_none());
    }
}
