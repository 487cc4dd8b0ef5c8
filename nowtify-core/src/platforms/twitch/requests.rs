// ========================================================
// File: nowtify-core/src/platforms/twitch/requests.rs
// ========================================================
//! Serde models for the Helix endpoints the adapter calls.

use serde::Deserialize;

/// Response from "Get Streams".
#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<StreamData>,
}

/// Single live stream record.
#[derive(Debug, Deserialize)]
pub struct StreamData {
    pub user_login: String,
    #[serde(default)]
    pub game_name: String,
    pub title: String,
    pub viewer_count: u32,
    pub started_at: String,
    pub thumbnail_url: String,
}

/// Response from "Get Users".
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    pub data: Vec<UserData>,
}

/// Single user record.
#[derive(Debug, Deserialize)]
pub struct UserData {
    pub login: String,
    pub profile_image_url: String,
    /// "partner", "affiliate" or "".
    #[serde(default)]
    pub broadcaster_type: String,
}

/// Response from "Search Channels".
#[derive(Debug, Deserialize)]
pub struct SearchChannelsResponse {
    pub data: Vec<ChannelResult>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelResult {
    pub broadcaster_login: String,
    pub display_name: String,
    pub is_live: bool,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// Response from "Get Teams".
#[derive(Debug, Deserialize)]
pub struct TeamsResponse {
    pub data: Vec<TeamData>,
}

#[derive(Debug, Deserialize)]
pub struct TeamData {
    pub thumbnail_url: Option<String>,
}

/// Helix thumbnail URLs carry `{width}`/`{height}` templates.
pub fn resolve_thumbnail(url: &str) -> String {
    url.replace("{width}", "320").replace("{height}", "180")
}

pub fn broadcaster_rank(broadcaster_type: &str) -> u8 {
    match broadcaster_type {
        "partner" => 2,
        "affiliate" => 1,
        _ => 0,
    }
}
