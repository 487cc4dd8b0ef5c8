// File: nowtify-common/src/models/config.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-platform API credentials, editable at runtime from the settings
/// surface. Changing them invalidates any cached Twitch token.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ApiCredentials {
    pub twitch_client_id: Option<String>,
    pub twitch_client_secret: Option<String>,
    pub youtube_api_key: Option<String>,
}

/// User-tunable behavior knobs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Gates the user-visible notification only; history always records.
    pub notifications: bool,
    /// Full-sweep cadence in minutes.
    pub refresh_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self { notifications: true, refresh_minutes: 5 }
    }
}

/// A Twitch app access token with its expiry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TwitchToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TwitchToken {
    /// Usable while at least `safety_margin` remains before expiry.
    pub fn is_valid(&self, now: DateTime<Utc>, safety_margin: chrono::Duration) -> bool {
        now < self.expires_at - safety_margin
    }
}
