// File: nowtify-core/src/platforms/twitch/mod.rs

pub mod requests;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, warn};

use nowtify_common::models::streamer::{Candidate, LiveStatus};
use nowtify_common::models::platform::Platform;
use nowtify_common::traits::repository_traits::ConfigRepository;

use crate::auth::TwitchTokenCache;
use crate::http::HttpClient;
use crate::platforms::{rank_candidates, StreamPlatform};

use requests::{
    broadcaster_rank, resolve_thumbnail, SearchChannelsResponse, StreamsResponse,
    TeamsResponse, UsersResponse,
};

const HELIX_BASE: &str = "https://api.twitch.tv/helix";

/// Helix caps `user_login` repetitions per streams request.
const BATCH_LIMIT: usize = 100;

const SEARCH_CAP: usize = 10;

pub struct TwitchPlatform {
    http: Arc<dyn HttpClient>,
    config: Arc<dyn ConfigRepository>,
    tokens: Arc<TwitchTokenCache>,
}

impl TwitchPlatform {
    pub fn new(
        http: Arc<dyn HttpClient>,
        config: Arc<dyn ConfigRepository>,
        tokens: Arc<TwitchTokenCache>,
    ) -> Self {
        Self { http, config, tokens }
    }

    /// Client id + bearer token, or None when either is unconfigured.
    /// Missing configuration means no network I/O at all.
    async fn auth_headers(&self) -> Option<HashMap<String, String>> {
        let client_id = self
            .config
            .get_api_credentials()
            .await
            .ok()?
            .twitch_client_id
            .filter(|id| !id.is_empty())?;
        let token = self.tokens.get_token().await.ok()??;

        let mut headers = HashMap::new();
        headers.insert("Client-Id".to_string(), client_id);
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        Some(headers)
    }

    /// GET with bearer auth; invalidates the token cache on a 401 so the
    /// next cycle can retry with a fresh token.
    async fn helix_get(&self, url: &str, headers: &HashMap<String, String>) -> Option<String> {
        let response = match self.http.get(url, headers).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Twitch request failed: {e}");
                return None;
            }
        };

        if response.is_unauthorized() {
            warn!("Twitch returned HTTP {}; invalidating token", response.status);
            if let Err(e) = self.tokens.invalidate().await {
                warn!("Token invalidation failed: {e}");
            }
            return None;
        }
        if !response.is_success() {
            warn!("Twitch returned HTTP {} for {url}", response.status);
            return None;
        }
        Some(response.body)
    }

    /// Used by the team service; not part of the adapter contract.
    pub async fn fetch_team_logo(&self, team_name: &str) -> Option<String> {
        let headers = self.auth_headers().await?;
        let url = format!("{HELIX_BASE}/teams?name={}", urlencoding::encode(team_name));
        let body = self.helix_get(&url, &headers).await?;
        let parsed: TeamsResponse = serde_json::from_str(&body).ok()?;
        parsed
            .data
            .into_iter()
            .next()
            .and_then(|t| t.thumbnail_url)
            .filter(|u| !u.is_empty())
    }
}

/// Map a batch "Get Streams" answer back onto the requested handles.
/// Every requested handle gets an entry: live ones from the response,
/// the rest explicitly offline.
fn demux_batch(requested: &[String], live: StreamsResponse) -> HashMap<String, LiveStatus> {
    let mut results: HashMap<String, LiveStatus> = requested
        .iter()
        .map(|h| (h.to_lowercase(), LiveStatus::offline()))
        .collect();

    for stream in live.data {
        let key = stream.user_login.to_lowercase();
        let status = LiveStatus {
            is_live: true,
            title: Some(stream.title),
            game: if stream.game_name.is_empty() { None } else { Some(stream.game_name) },
            viewer_count: Some(stream.viewer_count),
            thumbnail_url: Some(resolve_thumbnail(&stream.thumbnail_url)),
            started_at: DateTime::parse_from_rfc3339(&stream.started_at)
                .ok()
                .map(|dt| dt.to_utc()),
            ended_at: None,
            last_live_date: None,
            error: false,
        };
        results.insert(key, status);
    }
    results
}

fn all_failed(handles: &[String]) -> HashMap<String, LiveStatus> {
    handles
        .iter()
        .map(|h| (h.to_lowercase(), LiveStatus::check_failed()))
        .collect()
}

#[async_trait]
impl StreamPlatform for TwitchPlatform {
    async fn check_live_status(&self, handle: &str) -> LiveStatus {
        let mut batch = self.check_live_batch(&[handle.to_string()]).await;
        batch
            .remove(&handle.to_lowercase())
            .unwrap_or_else(LiveStatus::check_failed)
    }

    async fn check_live_batch(&self, handles: &[String]) -> HashMap<String, LiveStatus> {
        if handles.is_empty() {
            return HashMap::new();
        }
        let Some(headers) = self.auth_headers().await else {
            return all_failed(handles);
        };

        let mut results = HashMap::with_capacity(handles.len());
        for chunk in handles.chunks(BATCH_LIMIT) {
            let query: Vec<String> = chunk
                .iter()
                .map(|h| format!("user_login={}", urlencoding::encode(h)))
                .collect();
            let url = format!("{HELIX_BASE}/streams?{}", query.join("&"));

            let Some(body) = self.helix_get(&url, &headers).await else {
                results.extend(all_failed(chunk));
                continue;
            };
            match serde_json::from_str::<StreamsResponse>(&body) {
                Ok(parsed) => results.extend(demux_batch(chunk, parsed)),
                Err(e) => {
                    warn!("Twitch streams parse error: {e}");
                    results.extend(all_failed(chunk));
                }
            }
        }
        debug!("Twitch batch check resolved {} handle(s)", results.len());
        results
    }

    async fn fetch_avatar(&self, handle: &str) -> Option<String> {
        let headers = self.auth_headers().await?;
        let url = format!("{HELIX_BASE}/users?login={}", urlencoding::encode(handle));
        let body = self.helix_get(&url, &headers).await?;
        let parsed: UsersResponse = serde_json::from_str(&body).ok()?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|u| u.profile_image_url)
            .filter(|u| !u.is_empty())
    }

    async fn search(&self, query: &str) -> Vec<Candidate> {
        let Some(headers) = self.auth_headers().await else {
            return Vec::new();
        };
        let url = format!(
            "{HELIX_BASE}/search/channels?query={}&first={SEARCH_CAP}",
            urlencoding::encode(query)
        );
        let Some(body) = self.helix_get(&url, &headers).await else {
            return Vec::new();
        };
        let Ok(parsed) = serde_json::from_str::<SearchChannelsResponse>(&body) else {
            return Vec::new();
        };
        if parsed.data.is_empty() {
            return Vec::new();
        }

        // Partner/affiliate standing comes from a second, batched users
        // call; ranking degrades gracefully if it fails.
        let logins: Vec<String> = parsed
            .data
            .iter()
            .map(|c| format!("login={}", urlencoding::encode(&c.broadcaster_login)))
            .collect();
        let users_url = format!("{HELIX_BASE}/users?{}", logins.join("&"));
        let ranks: HashMap<String, u8> = match self.helix_get(&users_url, &headers).await {
            Some(body) => serde_json::from_str::<UsersResponse>(&body)
                .map(|u| {
                    u.data
                        .into_iter()
                        .map(|u| (u.login.to_lowercase(), broadcaster_rank(&u.broadcaster_type)))
                        .collect()
                })
                .unwrap_or_default(),
            None => HashMap::new(),
        };

        let mut candidates: Vec<Candidate> = parsed
            .data
            .into_iter()
            .map(|c| {
                let rank = ranks
                    .get(&c.broadcaster_login.to_lowercase())
                    .copied()
                    .unwrap_or(0);
                Candidate {
                    platform: Platform::Twitch,
                    handle: c.broadcaster_login,
                    display_name: c.display_name,
                    avatar_url: if c.thumbnail_url.is_empty() { None } else { Some(c.thumbnail_url) },
                    is_live: c.is_live,
                    rank,
                }
            })
            .collect();
        rank_candidates(&mut candidates, SEARCH_CAP);
        candidates
    }

    fn supports_batch(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::requests::StreamData;

    fn stream(login: &str) -> StreamData {
        StreamData {
            user_login: login.to_string(),
            game_name: "Tetris".to_string(),
            title: "hi".to_string(),
            viewer_count: 7,
            started_at: "2026-01-05T10:00:00Z".to_string(),
            thumbnail_url: "https://x/{width}x{height}.jpg".to_string(),
        }
    }

    #[test]
    fn demux_marks_missing_handles_offline() {
        let requested = vec!["a".to_string(), "B".to_string(), "c".to_string()];
        let live = StreamsResponse { data: vec![stream("A"), stream("c")] };

        let results = demux_batch(&requested, live);
        assert_eq!(results.len(), 3);
        assert!(results["a"].is_live);
        assert!(results["c"].is_live);
        assert!(!results["b"].is_live);
        assert!(!results["b"].error);
    }

    #[test]
    fn demux_fills_stream_fields() {
        let requested = vec!["a".to_string()];
        let live = StreamsResponse { data: vec![stream("a")] };

        let status = &demux_batch(&requested, live)["a"];
        assert_eq!(status.title.as_deref(), Some("hi"));
        assert_eq!(status.game.as_deref(), Some("Tetris"));
        assert_eq!(status.viewer_count, Some(7));
        assert_eq!(status.thumbnail_url.as_deref(), Some("https://x/320x180.jpg"));
        assert!(status.started_at.is_some());
        assert!(status.ended_at.is_none());
    }

    #[test]
    fn thumbnail_template_is_resolved() {
        assert_eq!(
            resolve_thumbnail("https://cdn/{width}x{height}/p.jpg"),
            "https://cdn/320x180/p.jpg"
        );
    }
}
