// File: nowtify-common/src/models/streamer.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// How far back a finished stream still counts as "recently live".
pub const RECENT_LIVE_THRESHOLD_HOURS: i64 = 12;

/// Snapshot of a channel's live state, replaced as one unit on every check.
///
/// `title`/`game`/`viewer_count`/`thumbnail_url` are best-effort and only
/// meaningful while `is_live` is set. `started_at` and `last_live_date`
/// survive the channel going offline so recency can still be computed.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct LiveStatus {
    pub is_live: bool,
    pub title: Option<String>,
    pub game: Option<String>,
    pub viewer_count: Option<u32>,
    pub thumbnail_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_live_date: Option<DateTime<Utc>>,
    /// Set when the last check attempt failed; known-good fields are kept.
    pub error: bool,
}

impl LiveStatus {
    /// Offline, no error. What a successful check returns for a channel
    /// that is not streaming.
    pub fn offline() -> Self {
        Self::default()
    }

    /// The sentinel a failed check resolves to, so one bad fetch never
    /// aborts the rest of a sweep.
    pub fn check_failed() -> Self {
        Self { error: true, ..Self::default() }
    }

    /// Recomputed on every read from `last_live_date`; never stored.
    pub fn was_live_recently(&self, now: DateTime<Utc>) -> bool {
        match self.last_live_date {
            Some(last) => now - last < Duration::hours(RECENT_LIVE_THRESHOLD_HOURS),
            None => false,
        }
    }
}

/// Polling cadence class, recomputed from the latest status on every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollTier {
    /// Currently live.
    Fast,
    /// Was live within the recency window.
    Normal,
    /// Everything else.
    Slow,
}

impl PollTier {
    pub fn interval(&self) -> std::time::Duration {
        match self {
            PollTier::Fast => std::time::Duration::from_secs(30),
            PollTier::Normal => std::time::Duration::from_secs(3 * 60),
            PollTier::Slow => std::time::Duration::from_secs(5 * 60),
        }
    }

    pub fn for_status(status: &LiveStatus, now: DateTime<Utc>) -> Self {
        if status.is_live {
            PollTier::Fast
        } else if status.was_live_recently(now) {
            PollTier::Normal
        } else {
            PollTier::Slow
        }
    }
}

/// A tracked channel. `(platform, lowercase handle)` is unique within the
/// registry and `streamer_id` never changes after creation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Streamer {
    pub streamer_id: Uuid,
    pub platform: Platform,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub team: Option<String>,
    pub status: LiveStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Streamer {
    pub fn new(platform: Platform, handle: &str) -> Self {
        Self {
            streamer_id: Uuid::new_v4(),
            platform,
            handle: handle.to_string(),
            display_name: handle.to_string(),
            avatar_url: None,
            team: None,
            status: LiveStatus::offline(),
            last_checked_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn poll_tier(&self, now: DateTime<Utc>) -> PollTier {
        PollTier::for_status(&self.status, now)
    }
}

/// Partial registry update. Omitted fields are left untouched by `patch`,
/// so a failed check never wipes a previously known title or avatar.
/// When `status` is present it replaces the stored status block whole.
#[derive(Debug, Clone, Default)]
pub struct StreamerPatch {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub team: Option<String>,
    pub status: Option<LiveStatus>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// One search result offered to the user when adding a streamer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Candidate {
    pub platform: Platform,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_live: bool,
    /// Platform-specific standing (partner > affiliate > none), used as a
    /// ranking tie-breaker after liveness.
    pub rank: u8,
}
