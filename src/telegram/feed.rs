//! Channel feed: recent channel posts, newest first, with media resolved to
//! download URLs.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::telegram::client::BotApi;
use crate::telegram::media::MediaResolver;
use crate::telegram::types::{TgChannelPost, TgUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Photo,
    Video,
}

/// One normalized channel post as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: i64,
    pub sender: String,
    pub text: String,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub thumbnail: Option<String>,
    pub time: String,
}

/// What a post carries, before any file reference is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MediaRef<'a> {
    None,
    Photo(&'a str),
    Video {
        file_id: &'a str,
        thumbnail: Option<&'a str>,
    },
}

impl<'a> MediaRef<'a> {
    /// A non-empty photo list wins over a video. For photos the last size
    /// variant is the largest. A descriptor without a `file_id` leaves the post
    /// as text.
    fn classify(post: &'a TgChannelPost) -> Self {
        if let Some(largest) = post.photo.as_deref().and_then(<[_]>::last) {
            return match largest.file_id.as_deref() {
                Some(file_id) => MediaRef::Photo(file_id),
                None => {
                    warn!(
                        "Post {}: photo has no file_id, serving as text",
                        post.message_id
                    );
                    MediaRef::None
                }
            };
        }
        if let Some(video) = &post.video {
            return match video.file_id.as_deref() {
                Some(file_id) => MediaRef::Video {
                    file_id,
                    thumbnail: video.thumbnail().and_then(|t| t.file_id.as_deref()),
                },
                None => {
                    warn!(
                        "Post {}: video has no file_id, serving as text",
                        post.message_id
                    );
                    MediaRef::None
                }
            };
        }
        MediaRef::None
    }
}

struct Upstream {
    api: Arc<dyn BotApi>,
    resolver: MediaResolver,
}

pub struct ChannelFeed {
    upstream: Option<Upstream>,
}

impl ChannelFeed {
    pub fn new(api: Arc<dyn BotApi>, resolver: MediaResolver) -> Self {
        Self {
            upstream: Some(Upstream { api, resolver }),
        }
    }

    /// A feed with no bot token behind it; every fetch is a configuration error.
    pub fn unconfigured() -> Self {
        Self { upstream: None }
    }

    /// Latest `limit` posts of `channel` (the chat username, without `@`),
    /// newest first.
    pub async fn fetch_latest(&self, channel: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let upstream = self
            .upstream
            .as_ref()
            .ok_or_else(|| Error::Config("telegram bot token is not set".to_string()))?;

        let updates = upstream.api.get_updates().await?;
        let posts = select_posts(updates, channel, limit);

        debug!(
            "Channel {}: {} post(s) selected for the feed",
            channel,
            posts.len()
        );

        // Resolutions run concurrently; join_all keeps the input order.
        let items = join_all(
            posts
                .iter()
                .map(|post| build_item(&upstream.resolver, channel, post, Utc::now())),
        )
        .await;

        info!("Channel {}: returning {} feed item(s)", channel, items.len());
        Ok(items)
    }
}

/// Channel posts of `channel`, capped to the most recent `limit` and ordered
/// newest first. Updates arrive oldest first; undecodable records are skipped.
fn select_posts(updates: Vec<Value>, channel: &str, limit: usize) -> Vec<TgChannelPost> {
    let mut posts: Vec<TgChannelPost> = updates
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<TgUpdate>(raw) {
            Ok(update) => update.channel_post,
            Err(e) => {
                debug!("Skipping undecodable update: {}", e);
                None
            }
        })
        .filter(|post| post.chat_username() == Some(channel))
        .collect();

    let skip = posts.len().saturating_sub(limit);
    posts.drain(..skip);
    posts.reverse();
    posts
}

async fn build_item(
    resolver: &MediaResolver,
    channel: &str,
    post: &TgChannelPost,
    now: DateTime<Utc>,
) -> FeedItem {
    let (media_type, media_url, thumbnail) = match MediaRef::classify(post) {
        MediaRef::None => (MediaType::Text, None, None),
        MediaRef::Photo(file_id) => match resolver.resolve(file_id).await {
            Ok(url) => (MediaType::Photo, Some(url), None),
            Err(e) => {
                warn!(
                    "Post {} in {}: photo unavailable, serving as text: {}",
                    post.message_id, channel, e
                );
                (MediaType::Text, None, None)
            }
        },
        MediaRef::Video { file_id, thumbnail } => {
            let thumb = async {
                match thumbnail {
                    Some(thumb_id) => Some(resolver.resolve(thumb_id).await),
                    None => None,
                }
            };
            let (video, thumb) = futures::join!(resolver.resolve(file_id), thumb);
            let thumb = match thumb {
                Some(Ok(url)) => Some(url),
                Some(Err(e)) => {
                    warn!(
                        "Post {} in {}: thumbnail unavailable: {}",
                        post.message_id, channel, e
                    );
                    None
                }
                None => None,
            };
            match video {
                Ok(url) => (MediaType::Video, Some(url), thumb),
                Err(e) => {
                    warn!(
                        "Post {} in {}: video unavailable, serving as text: {}",
                        post.message_id, channel, e
                    );
                    (MediaType::Text, None, None)
                }
            }
        }
    };

    let sender = post
        .chat_title()
        .filter(|t| !t.is_empty())
        .unwrap_or(channel)
        .to_string();

    FeedItem {
        id: post.message_id,
        sender,
        text: post.body().to_string(),
        media_type,
        media_url,
        thumbnail,
        time: post_time(post.date, now),
    }
}

/// ISO-8601 UTC with milliseconds; `now` when the post has no usable date.
fn post_time(date: Option<i64>, now: DateTime<Utc>) -> String {
    date.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
