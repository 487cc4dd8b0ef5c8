// File: nowtify-common/src/models/mod.rs
pub mod platform;
pub mod streamer;
pub mod history;
pub mod config;

pub use platform::Platform;
pub use streamer::{Candidate, LiveStatus, PollTier, Streamer, StreamerPatch, RECENT_LIVE_THRESHOLD_HOURS};
pub use history::{HistoryEntry, HISTORY_CAP};
pub use config::{ApiCredentials, Settings, TwitchToken};
