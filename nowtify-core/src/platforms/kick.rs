// File: nowtify-core/src/platforms/kick.rs
//
// Kick has no official API; the public channels endpoint needs no
// authentication.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::warn;

use nowtify_common::models::platform::Platform;
use nowtify_common::models::streamer::{Candidate, LiveStatus};

use crate::http::HttpClient;
use crate::platforms::{rank_candidates, StreamPlatform};

const API_BASE: &str = "https://kick.com/api/v2";
const SEARCH_BASE: &str = "https://kick.com/api/search";

const SEARCH_CAP: usize = 5;

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    livestream: Option<Livestream>,
    user: Option<KickUser>,
}

#[derive(Debug, Deserialize)]
struct Livestream {
    session_title: Option<String>,
    #[serde(default)]
    viewer_count: u32,
    thumbnail: Option<KickThumbnail>,
    created_at: Option<String>,
    categories: Option<Vec<KickCategory>>,
}

#[derive(Debug, Deserialize)]
struct KickThumbnail {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KickCategory {
    name: String,
}

#[derive(Debug, Deserialize)]
struct KickUser {
    username: Option<String>,
    profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    channels: Vec<SearchChannel>,
}

#[derive(Debug, Deserialize)]
struct SearchChannel {
    slug: String,
    #[serde(default)]
    is_live: bool,
    #[serde(default)]
    verified: bool,
    user: Option<KickUser>,
}

/// Kick hands back a stock image instead of omitting the field; treat
/// those the same as no avatar at all.
fn filter_placeholder(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.is_empty() && !u.contains("default-profile") && !u.contains("default_profile"))
}

/// Kick timestamps come as either RFC 3339 or `YYYY-MM-DD HH:MM:SS`.
fn parse_kick_time(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_utc());
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

pub struct KickPlatform {
    http: Arc<dyn HttpClient>,
}

impl KickPlatform {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    async fn fetch_channel(&self, handle: &str) -> Option<ChannelResponse> {
        let url = format!("{API_BASE}/channels/{}", urlencoding::encode(handle));
        let response = match self.http.get(&url, &HashMap::new()).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Kick request failed: {e}");
                return None;
            }
        };
        if !response.is_success() {
            warn!("Kick returned HTTP {} for {handle}", response.status);
            return None;
        }
        serde_json::from_str(&response.body).ok()
    }
}

#[async_trait]
impl StreamPlatform for KickPlatform {
    async fn check_live_status(&self, handle: &str) -> LiveStatus {
        let Some(channel) = self.fetch_channel(handle).await else {
            return LiveStatus::check_failed();
        };
        let Some(live) = channel.livestream else {
            return LiveStatus::offline();
        };

        let thumbnail = live
            .thumbnail
            .and_then(|t| t.url)
            .or_else(|| channel.user.as_ref().and_then(|u| u.profile_pic.clone()));

        LiveStatus {
            is_live: true,
            title: Some(live.session_title.unwrap_or_else(|| "Untitled".to_string())),
            game: live
                .categories
                .and_then(|c| c.into_iter().next())
                .map(|c| c.name),
            viewer_count: Some(live.viewer_count),
            thumbnail_url: thumbnail.filter(|u| !u.is_empty()),
            started_at: live.created_at.as_deref().and_then(parse_kick_time),
            ended_at: None,
            last_live_date: None,
            error: false,
        }
    }

    async fn fetch_avatar(&self, handle: &str) -> Option<String> {
        let channel = self.fetch_channel(handle).await?;
        filter_placeholder(channel.user.and_then(|u| u.profile_pic))
    }

    async fn search(&self, query: &str) -> Vec<Candidate> {
        let url = format!("{SEARCH_BASE}?searched_word={}", urlencoding::encode(query));
        let body = match self.http.get(&url, &HashMap::new()).await {
            Ok(r) if r.is_success() => r.body,
            _ => return Vec::new(),
        };
        let Ok(parsed) = serde_json::from_str::<SearchResponse>(&body) else {
            return Vec::new();
        };

        let mut candidates: Vec<Candidate> = parsed
            .channels
            .into_iter()
            .map(|c| {
                let display_name = c
                    .user
                    .as_ref()
                    .and_then(|u| u.username.clone())
                    .unwrap_or_else(|| c.slug.clone());
                Candidate {
                    platform: Platform::Kick,
                    avatar_url: filter_placeholder(c.user.and_then(|u| u.profile_pic)),
                    handle: c.slug,
                    display_name,
                    is_live: c.is_live,
                    rank: c.verified as u8,
                }
            })
            .collect();
        rank_candidates(&mut candidates, SEARCH_CAP);
        candidates
    }
}
