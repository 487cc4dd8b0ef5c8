// File: nowtify-common/src/models/history.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::platform::Platform;

/// Ring-buffer cap: only the most recent entries are kept.
pub const HISTORY_CAP: usize = 50;

/// One "went live" record. `duration_secs` is unknown when the entry is
/// appended and is backfilled once the stream ends.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryEntry {
    pub streamer_id: Uuid,
    pub name: String,
    pub platform: Platform,
    pub title: Option<String>,
    pub game: Option<String>,
    pub viewer_count: Option<u32>,
    pub duration_secs: Option<i64>,
    pub timestamp: DateTime<Utc>,
}
