//! nowtify-core/src/services/api.rs
//!
//! The message surface consumed by the popup/options front-end. Requests
//! arrive as one closed enum, responses leave as another; the front-end
//! renders whatever comes back and never touches core state directly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use nowtify_common::models::config::{ApiCredentials, Settings};
use nowtify_common::models::history::HistoryEntry;
use nowtify_common::models::platform::{parse_stream_reference, Platform};
use nowtify_common::models::streamer::{Candidate, PollTier, Streamer};
use nowtify_common::traits::repository_traits::{
    ConfigRepository, HistoryRepository, StreamerRepository,
};

use crate::Error;
use crate::auth::TwitchTokenCache;
use crate::platforms::manager::PlatformManager;
use crate::services::scheduler::AdaptiveScheduler;
use crate::services::team_service::TeamService;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ApiRequest {
    CheckNow,
    GetStreamersData,
    SearchStreamers { query: String, platform: Option<Platform> },
    /// `input` is free-form: a channel URL or a bare name.
    AddStreamer { input: String, team: Option<String> },
    RemoveStreamer { streamer_id: Uuid },
    SettingsUpdated {
        api_keys: Option<ApiCredentials>,
        settings: Option<Settings>,
    },
    UpdateAlarm { minutes: u32 },
    GetHistory { limit: Option<i64> },
    ClearHistory,
    RemoveTeam { team: String },
}

/// A streamer as the front-end sees it: stored fields plus the derived
/// bits recomputed at read time.
#[derive(Debug, Clone, Serialize)]
pub struct StreamerView {
    #[serde(flatten)]
    pub streamer: Streamer,
    pub was_live_recently: bool,
    pub priority: PollTier,
}

impl StreamerView {
    pub fn from_streamer(streamer: Streamer, now: DateTime<Utc>) -> Self {
        let was_live_recently = streamer.status.was_live_recently(now);
        let priority = streamer.poll_tier(now);
        Self { streamer, was_live_recently, priority }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiResponse {
    Success { success: bool },
    Streamers { streamers: Vec<StreamerView>, any_live: bool },
    Streamer { streamer: Box<StreamerView> },
    Candidates { candidates: Vec<Candidate> },
    History { history: Vec<HistoryEntry> },
    Removed { removed: u64 },
}

pub struct ApiService {
    streamers: Arc<dyn StreamerRepository>,
    config: Arc<dyn ConfigRepository>,
    history: Arc<dyn HistoryRepository>,
    platforms: Arc<PlatformManager>,
    tokens: Arc<TwitchTokenCache>,
    scheduler: Arc<AdaptiveScheduler>,
    teams: Arc<TeamService>,
    alarm_tx: watch::Sender<Duration>,
}

impl ApiService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        streamers: Arc<dyn StreamerRepository>,
        config: Arc<dyn ConfigRepository>,
        history: Arc<dyn HistoryRepository>,
        platforms: Arc<PlatformManager>,
        tokens: Arc<TwitchTokenCache>,
        scheduler: Arc<AdaptiveScheduler>,
        teams: Arc<TeamService>,
        alarm_tx: watch::Sender<Duration>,
    ) -> Self {
        Self {
            streamers,
            config,
            history,
            platforms,
            tokens,
            scheduler,
            teams,
            alarm_tx,
        }
    }

    pub async fn handle(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        match request {
            ApiRequest::CheckNow => {
                self.scheduler.run_sweep_and_reschedule().await?;
                Ok(ApiResponse::Success { success: true })
            }
            ApiRequest::GetStreamersData => {
                let (streamers, any_live) = self.get_streamers_data().await?;
                Ok(ApiResponse::Streamers { streamers, any_live })
            }
            ApiRequest::SearchStreamers { query, platform } => {
                let candidates = self.platforms.search(&query, platform).await;
                Ok(ApiResponse::Candidates { candidates })
            }
            ApiRequest::AddStreamer { input, team } => {
                let (platform, handle) = parse_stream_reference(&input)
                    .ok_or_else(|| Error::Parse(format!("Unrecognized streamer input: {input}")))?;
                let view = self.add_streamer(platform, &handle, team).await?;
                Ok(ApiResponse::Streamer { streamer: Box::new(view) })
            }
            ApiRequest::RemoveStreamer { streamer_id } => {
                self.remove_streamer(streamer_id).await?;
                Ok(ApiResponse::Success { success: true })
            }
            ApiRequest::SettingsUpdated { api_keys, settings } => {
                self.settings_updated(api_keys, settings).await?;
                Ok(ApiResponse::Success { success: true })
            }
            ApiRequest::UpdateAlarm { minutes } => {
                self.update_alarm(minutes).await?;
                Ok(ApiResponse::Success { success: true })
            }
            ApiRequest::GetHistory { limit } => {
                let history = self.history.recent(limit.unwrap_or(50)).await?;
                Ok(ApiResponse::History { history })
            }
            ApiRequest::ClearHistory => {
                self.history.clear().await?;
                Ok(ApiResponse::Success { success: true })
            }
            ApiRequest::RemoveTeam { team } => {
                let removed = self.teams.remove_team(&team).await?;
                Ok(ApiResponse::Removed { removed })
            }
        }
    }

    /// Enriched registry snapshot plus the "anything live" badge flag.
    pub async fn get_streamers_data(&self) -> Result<(Vec<StreamerView>, bool), Error> {
        let now = Utc::now();
        let views: Vec<StreamerView> = self
            .streamers
            .list()
            .await?
            .into_iter()
            .map(|s| StreamerView::from_streamer(s, now))
            .collect();
        let any_live = views.iter().any(|v| v.streamer.status.is_live);
        Ok((views, any_live))
    }

    pub async fn add_streamer(
        &self,
        platform: Platform,
        handle: &str,
        team: Option<String>,
    ) -> Result<StreamerView, Error> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(Error::Parse("Streamer handle must not be empty".into()));
        }
        if self.streamers.find_by_handle(platform, handle).await?.is_some() {
            return Err(Error::AlreadyTracked(format!("{platform}/{handle}")));
        }

        let mut streamer = Streamer::new(platform, handle);
        streamer.team = team;
        if let Some(url) = self.platforms.adapter(platform).fetch_avatar(handle).await {
            streamer.avatar_url = Some(url);
        }
        self.streamers.upsert(&streamer).await?;
        info!("Now tracking {platform}/{handle}");

        // First check straight away; the timer then settles on the tier.
        self.scheduler.schedule_check(streamer.streamer_id, Duration::ZERO);

        Ok(StreamerView::from_streamer(streamer, Utc::now()))
    }

    pub async fn remove_streamer(&self, streamer_id: Uuid) -> Result<(), Error> {
        self.streamers.remove(streamer_id).await?;
        self.scheduler.cancel(streamer_id);
        info!("Stopped tracking {streamer_id}");
        Ok(())
    }

    /// Credential changes drop the cached Twitch token so the next check
    /// authenticates with the new secrets.
    pub async fn settings_updated(
        &self,
        api_keys: Option<ApiCredentials>,
        settings: Option<Settings>,
    ) -> Result<(), Error> {
        if let Some(keys) = api_keys {
            self.config.set_api_credentials(&keys).await?;
            self.tokens.invalidate().await?;
        }
        if let Some(settings) = settings {
            self.config.set_settings(&settings).await?;
        }
        Ok(())
    }

    /// Retune the periodic sweep cadence and persist it.
    pub async fn update_alarm(&self, minutes: u32) -> Result<(), Error> {
        let minutes = minutes.max(1);
        let mut settings = self.config.get_settings().await?;
        settings.refresh_minutes = minutes;
        self.config.set_settings(&settings).await?;

        let _ = self.alarm_tx.send(Duration::from_secs(u64::from(minutes) * 60));
        info!("Sweep cadence set to {minutes} minute(s)");
        Ok(())
    }
}
