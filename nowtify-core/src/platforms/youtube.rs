// File: nowtify-core/src/platforms/youtube.rs
//
// YouTube Data API v3. A live check is up to three dependent calls:
// channel resolution (unless the handle already is a channel id), a
// live-video search, then a details fetch for viewer count and start
// time. Any empty stage short-circuits to offline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, warn};

use nowtify_common::models::platform::Platform;
use nowtify_common::models::streamer::{Candidate, LiveStatus};
use nowtify_common::traits::repository_traits::ConfigRepository;

use crate::http::HttpClient;
use crate::platforms::{rank_candidates, StreamPlatform};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const SEARCH_CAP: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    #[serde(rename = "liveStreamingDetails")]
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct LiveStreamingDetails {
    #[serde(rename = "concurrentViewers")]
    concurrent_viewers: Option<String>,
    #[serde(rename = "actualStartTime")]
    actual_start_time: Option<String>,
}

/// Channel ids look like `UC` + 22 more characters; anything else needs a
/// search round-trip first.
fn is_channel_id(handle: &str) -> bool {
    handle.len() == 24
        && handle.starts_with("UC")
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub struct YoutubePlatform {
    http: Arc<dyn HttpClient>,
    config: Arc<dyn ConfigRepository>,
}

impl YoutubePlatform {
    pub fn new(http: Arc<dyn HttpClient>, config: Arc<dyn ConfigRepository>) -> Self {
        Self { http, config }
    }

    async fn api_key(&self) -> Option<String> {
        self.config
            .get_api_credentials()
            .await
            .ok()?
            .youtube_api_key
            .filter(|k| !k.is_empty())
    }

    async fn api_get(&self, url: &str) -> Option<String> {
        match self.http.get(url, &HashMap::new()).await {
            Ok(r) if r.is_success() => Some(r.body),
            Ok(r) => {
                warn!("YouTube returned HTTP {}", r.status);
                None
            }
            Err(e) => {
                warn!("YouTube request failed: {e}");
                None
            }
        }
    }

    async fn resolve_channel_id(&self, handle: &str, key: &str) -> Option<String> {
        if is_channel_id(handle) {
            return Some(handle.to_string());
        }
        let url = format!(
            "{API_BASE}/search?part=snippet&type=channel&q={}&key={}",
            urlencoding::encode(handle),
            key
        );
        let body = self.api_get(&url).await?;
        let parsed: SearchResponse = serde_json::from_str(&body).ok()?;
        parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.snippet.channel_id.or(item.id.channel_id))
    }
}

#[async_trait]
impl StreamPlatform for YoutubePlatform {
    async fn check_live_status(&self, handle: &str) -> LiveStatus {
        let Some(key) = self.api_key().await else {
            debug!("No YouTube API key configured; skipping check for {handle}");
            return LiveStatus::check_failed();
        };

        // Stage 1: handle -> channel id.
        let Some(channel_id) = self.resolve_channel_id(handle, &key).await else {
            return LiveStatus::offline();
        };

        // Stage 2: is there a live video on the channel?
        let url = format!(
            "{API_BASE}/search?part=snippet&channelId={channel_id}&eventType=live&type=video&key={key}"
        );
        let Some(body) = self.api_get(&url).await else {
            return LiveStatus::check_failed();
        };
        let Ok(parsed) = serde_json::from_str::<SearchResponse>(&body) else {
            return LiveStatus::check_failed();
        };
        let Some(video_id) = parsed.items.into_iter().next().and_then(|i| i.id.video_id) else {
            return LiveStatus::offline();
        };

        // Stage 3: viewer count and start time.
        let url = format!(
            "{API_BASE}/videos?part=liveStreamingDetails,snippet&id={video_id}&key={key}"
        );
        let Some(body) = self.api_get(&url).await else {
            return LiveStatus::check_failed();
        };
        let Ok(parsed) = serde_json::from_str::<VideosResponse>(&body) else {
            return LiveStatus::check_failed();
        };
        let Some(video) = parsed.items.into_iter().next() else {
            return LiveStatus::offline();
        };

        let details = video.live_streaming_details;
        LiveStatus {
            is_live: true,
            title: Some(video.snippet.title),
            game: None,
            viewer_count: details
                .as_ref()
                .and_then(|d| d.concurrent_viewers.as_deref())
                .and_then(|v| v.parse().ok()),
            thumbnail_url: video
                .snippet
                .thumbnails
                .medium
                .or(video.snippet.thumbnails.default)
                .map(|t| t.url),
            started_at: details
                .as_ref()
                .and_then(|d| d.actual_start_time.as_deref())
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|dt| dt.to_utc()),
            ended_at: None,
            last_live_date: None,
            error: false,
        }
    }

    async fn fetch_avatar(&self, handle: &str) -> Option<String> {
        let key = self.api_key().await?;
        // The channel search snippet already carries the avatar thumbnail.
        let url = format!(
            "{API_BASE}/search?part=snippet&type=channel&q={}&key={}",
            urlencoding::encode(handle),
            key
        );
        let body = self.api_get(&url).await?;
        let parsed: SearchResponse = serde_json::from_str(&body).ok()?;
        parsed
            .items
            .into_iter()
            .next()
            .and_then(|i| i.snippet.thumbnails.default.or(i.snippet.thumbnails.medium))
            .map(|t| t.url)
    }

    async fn search(&self, query: &str) -> Vec<Candidate> {
        let Some(key) = self.api_key().await else {
            return Vec::new();
        };
        let url = format!(
            "{API_BASE}/search?part=snippet&type=channel&q={}&maxResults={SEARCH_CAP}&key={}",
            urlencoding::encode(query),
            key
        );
        let Some(body) = self.api_get(&url).await else {
            return Vec::new();
        };
        let Ok(parsed) = serde_json::from_str::<SearchResponse>(&body) else {
            return Vec::new();
        };

        let mut candidates: Vec<Candidate> = parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let channel_id = item.snippet.channel_id.or(item.id.channel_id)?;
                Some(Candidate {
                    platform: Platform::Youtube,
                    display_name: item
                        .snippet
                        .channel_title
                        .unwrap_or_else(|| item.snippet.title.clone()),
                    handle: channel_id,
                    avatar_url: item
                        .snippet
                        .thumbnails
                        .default
                        .or(item.snippet.thumbnails.medium)
                        .map(|t| t.url),
                    is_live: false,
                    rank: 0,
                })
            })
            .collect();
        rank_candidates(&mut candidates, SEARCH_CAP);
        candidates
    }
}
