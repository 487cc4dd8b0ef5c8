// File: nowtify-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::config::{ApiCredentials, Settings, TwitchToken};
use crate::models::history::HistoryEntry;
use crate::models::platform::Platform;
use crate::models::streamer::{Streamer, StreamerPatch};

/// The authoritative set of tracked streamers. All mutation goes through
/// this trait; the scheduler and reconciler only ever merge copies back
/// via `patch`.
#[async_trait]
pub trait StreamerRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Streamer>, Error>;

    async fn get(&self, streamer_id: Uuid) -> Result<Option<Streamer>, Error>;

    /// Case-insensitive handle lookup within one platform.
    async fn find_by_handle(&self, platform: Platform, handle: &str) -> Result<Option<Streamer>, Error>;

    /// Insert or replace by id. Fails with `Error::AlreadyTracked` when a
    /// different streamer already owns `(platform, lowercase handle)`.
    async fn upsert(&self, streamer: &Streamer) -> Result<(), Error>;

    async fn remove(&self, streamer_id: Uuid) -> Result<(), Error>;

    /// Bulk removal when a team/group is deleted. Returns how many went.
    async fn remove_by_team(&self, team: &str) -> Result<u64, Error>;

    /// Tombstone merge: fields omitted from the patch stay as stored.
    async fn patch(&self, streamer_id: Uuid, patch: &StreamerPatch) -> Result<(), Error>;
}

/// Keyed configuration records: API credentials, settings, cached token.
/// Each is independently readable/writable.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn get_api_credentials(&self) -> Result<ApiCredentials, Error>;
    async fn set_api_credentials(&self, creds: &ApiCredentials) -> Result<(), Error>;

    async fn get_settings(&self) -> Result<Settings, Error>;
    async fn set_settings(&self, settings: &Settings) -> Result<(), Error>;

    async fn get_twitch_token(&self) -> Result<Option<TwitchToken>, Error>;
    async fn set_twitch_token(&self, token: &TwitchToken) -> Result<(), Error>;
    async fn clear_twitch_token(&self) -> Result<(), Error>;
}

/// Append-only "went live" history with ring-buffer eviction.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Appends an entry and evicts the oldest past the cap.
    async fn append(&self, entry: &HistoryEntry) -> Result<(), Error>;

    /// Newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<HistoryEntry>, Error>;

    /// Backfill the duration on the most recent entry for a streamer once
    /// the session ends.
    async fn set_last_duration(&self, streamer_id: Uuid, duration_secs: i64) -> Result<(), Error>;

    async fn clear(&self) -> Result<(), Error>;
}

/// Team logo cache. A stored `None` is a remembered negative lookup so we
/// do not keep retrying names that resolve to nothing.
#[async_trait]
pub trait TeamLogoRepository: Send + Sync {
    async fn get(&self, team: &str) -> Result<Option<Option<String>>, Error>;
    async fn set(&self, team: &str, logo_url: Option<&str>) -> Result<(), Error>;
    async fn remove(&self, team: &str) -> Result<(), Error>;
}
