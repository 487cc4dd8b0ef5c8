// File: nowtify-core/tests/api_tests.rs
//
// Message-surface flows, the token cache lifecycle, and team logo
// lookups, all against canned HTTP responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use nowtify_common::models::config::{ApiCredentials, Settings, TwitchToken};
use nowtify_common::models::platform::Platform;
use nowtify_common::traits::repository_traits::{
    ConfigRepository, HistoryRepository, StreamerRepository, TeamLogoRepository,
};
use nowtify_core::auth::TwitchTokenCache;
use nowtify_core::db::Database;
use nowtify_core::http::{HttpClient, HttpResponse};
use nowtify_core::platforms::manager::PlatformManager;
use nowtify_core::platforms::twitch::TwitchPlatform;
use nowtify_core::repositories::{
    SqliteConfigRepository, SqliteHistoryRepository, SqliteStreamerRepository,
    SqliteTeamLogoRepository,
};
use nowtify_core::services::api::{ApiRequest, ApiResponse, ApiService};
use nowtify_core::services::scheduler::AdaptiveScheduler;
use nowtify_core::services::sweep::SweepService;
use nowtify_core::services::team_service::TeamService;
use nowtify_core::eventbus::EventBus;
use nowtify_core::Error;

/// Canned HTTP client: every URL gets the same response; calls counted.
struct CannedHttp {
    status: u16,
    body: StdMutex<String>,
    calls: AtomicUsize,
}

impl CannedHttp {
    fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: StdMutex::new(body.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for CannedHttp {
    async fn get(&self, _url: &str, _headers: &HashMap<String, String>) -> Result<HttpResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse { status: self.status, body: self.body.lock().unwrap().clone() })
    }

    async fn post_form(&self, _url: &str, _form: &[(String, String)]) -> Result<HttpResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse { status: self.status, body: self.body.lock().unwrap().clone() })
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    streamers: Arc<dyn StreamerRepository>,
    config: Arc<dyn ConfigRepository>,
    api: ApiService,
    alarm_rx: watch::Receiver<Duration>,
}

/// Full service stack over a canned HTTP client that answers every call
/// with an empty-but-valid payload.
async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/nowtify-test.db", dir.path().display());
    let db = Database::new(&url).await.expect("open db");
    db.migrate().await.expect("migrate");
    let pool = db.pool().clone();

    let streamers: Arc<dyn StreamerRepository> =
        Arc::new(SqliteStreamerRepository::new(pool.clone()));
    let config: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigRepository::new(pool.clone()));
    let history: Arc<dyn HistoryRepository> = Arc::new(SqliteHistoryRepository::new(pool.clone()));
    let logos: Arc<dyn TeamLogoRepository> =
        Arc::new(SqliteTeamLogoRepository::new(pool.clone()));

    let http = Arc::new(CannedHttp::new(200, r#"{"data": [], "items": [], "channels": []}"#));
    let tokens = Arc::new(TwitchTokenCache::new(http.clone(), config.clone()));
    let twitch = Arc::new(TwitchPlatform::new(http.clone(), config.clone(), tokens.clone()));
    let youtube = Arc::new(nowtify_core::platforms::youtube::YoutubePlatform::new(
        http.clone(),
        config.clone(),
    ));
    let kick = Arc::new(nowtify_core::platforms::kick::KickPlatform::new(http.clone()));
    let platforms = Arc::new(PlatformManager::new(twitch.clone(), youtube, kick));

    let event_bus = Arc::new(EventBus::new());
    let sweep = Arc::new(SweepService::new(
        streamers.clone(),
        platforms.clone(),
        event_bus,
    ));
    let scheduler = AdaptiveScheduler::new(sweep);
    let teams = Arc::new(TeamService::new(streamers.clone(), logos, twitch));

    let (alarm_tx, alarm_rx) = watch::channel(Duration::from_secs(300));
    let api = ApiService::new(
        streamers.clone(),
        config.clone(),
        history,
        platforms,
        tokens.clone(),
        scheduler,
        teams,
        alarm_tx,
    );

    Fixture { _dir: dir, streamers, config, api, alarm_rx }
}

#[tokio::test]
async fn add_streamer_rejects_case_insensitive_duplicates() -> Result<(), Error> {
    let fx = fixture().await;

    fx.api.add_streamer(Platform::Twitch, "Foo", None).await?;
    match fx.api.add_streamer(Platform::Twitch, "foo", None).await {
        Err(Error::AlreadyTracked(_)) => {}
        other => panic!("expected AlreadyTracked, got {other:?}"),
    }

    assert_eq!(fx.streamers.list().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn add_streamer_parses_free_form_input() -> Result<(), Error> {
    let fx = fixture().await;

    let response = fx
        .api
        .handle(ApiRequest::AddStreamer {
            input: "https://kick.com/trainwreck".to_string(),
            team: None,
        })
        .await?;

    match response {
        ApiResponse::Streamer { streamer } => {
            assert_eq!(streamer.streamer.platform, Platform::Kick);
            assert_eq!(streamer.streamer.handle, "trainwreck");
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match fx.api.handle(ApiRequest::AddStreamer { input: "???".to_string(), team: None }).await {
        Err(Error::Parse(_)) => {}
        other => panic!("expected Parse error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn remove_streamer_clears_registry() -> Result<(), Error> {
    let fx = fixture().await;

    let view = fx.api.add_streamer(Platform::Kick, "bob", None).await?;
    fx.api.remove_streamer(view.streamer.streamer_id).await?;
    assert!(fx.streamers.list().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn streamers_data_reports_badge_flag_and_recency() -> Result<(), Error> {
    let fx = fixture().await;

    let (views, any_live) = fx.api.get_streamers_data().await?;
    assert!(views.is_empty());
    assert!(!any_live);

    let view = fx.api.add_streamer(Platform::Twitch, "alice", None).await?;

    // Flip the stored status to live through the registry patch path.
    let mut status = view.streamer.status.clone();
    status.is_live = true;
    status.last_live_date = Some(Utc::now());
    fx.streamers
        .patch(
            view.streamer.streamer_id,
            &nowtify_common::models::streamer::StreamerPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await?;

    let (views, any_live) = fx.api.get_streamers_data().await?;
    assert_eq!(views.len(), 1);
    assert!(any_live);
    assert!(views[0].was_live_recently);
    Ok(())
}

#[tokio::test]
async fn settings_update_invalidates_cached_token() -> Result<(), Error> {
    let fx = fixture().await;

    let token = TwitchToken {
        access_token: "stale".to_string(),
        expires_at: Utc::now() + chrono::Duration::hours(2),
    };
    fx.config.set_twitch_token(&token).await?;

    let response = fx
        .api
        .handle(ApiRequest::SettingsUpdated {
            api_keys: Some(ApiCredentials {
                twitch_client_id: Some("new-id".to_string()),
                twitch_client_secret: Some("new-secret".to_string()),
                youtube_api_key: None,
            }),
            settings: Some(Settings { notifications: false, refresh_minutes: 3 }),
        })
        .await?;
    assert!(matches!(response, ApiResponse::Success { success: true }));

    assert!(fx.config.get_twitch_token().await?.is_none());
    assert_eq!(fx.config.get_settings().await?.refresh_minutes, 3);
    Ok(())
}

#[tokio::test]
async fn update_alarm_retunes_the_poller_channel() -> Result<(), Error> {
    let fx = fixture().await;

    fx.api.update_alarm(2).await?;
    assert_eq!(*fx.alarm_rx.borrow(), Duration::from_secs(120));
    assert_eq!(fx.config.get_settings().await?.refresh_minutes, 2);

    // Zero is clamped rather than disabling the alarm.
    fx.api.update_alarm(0).await?;
    assert_eq!(*fx.alarm_rx.borrow(), Duration::from_secs(60));
    Ok(())
}

#[tokio::test]
async fn short_search_queries_return_no_candidates() -> Result<(), Error> {
    let fx = fixture().await;

    let response = fx
        .api
        .handle(ApiRequest::SearchStreamers { query: "a".to_string(), platform: None })
        .await?;
    match response {
        ApiResponse::Candidates { candidates } => assert!(candidates.is_empty()),
        other => panic!("unexpected response: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn token_cache_short_circuits_without_credentials() -> Result<(), Error> {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/nowtify-test.db", dir.path().display());
    let db = Database::new(&url).await?;
    db.migrate().await?;
    let config: Arc<dyn ConfigRepository> =
        Arc::new(SqliteConfigRepository::new(db.pool().clone()));

    let http = Arc::new(CannedHttp::new(
        200,
        r#"{"access_token": "fresh-token", "expires_in": 3600}"#,
    ));
    let cache = TwitchTokenCache::new(http.clone(), config.clone());

    // No client id/secret: no token and, crucially, no network traffic.
    assert_eq!(cache.get_token().await?, None);
    assert_eq!(http.calls(), 0);

    config
        .set_api_credentials(&ApiCredentials {
            twitch_client_id: Some("cid".to_string()),
            twitch_client_secret: Some("secret".to_string()),
            youtube_api_key: None,
        })
        .await?;

    // First request fetches, second reuses the cached slot.
    assert_eq!(cache.get_token().await?, Some("fresh-token".to_string()));
    assert_eq!(http.calls(), 1);
    assert_eq!(cache.get_token().await?, Some("fresh-token".to_string()));
    assert_eq!(http.calls(), 1);

    // A fresh cache instance picks up the persisted token without a fetch.
    let cache2 = TwitchTokenCache::new(http.clone(), config.clone());
    assert_eq!(cache2.get_token().await?, Some("fresh-token".to_string()));
    assert_eq!(http.calls(), 1);

    // Invalidation forces the next call back to the endpoint.
    cache.invalidate().await?;
    assert_eq!(cache.get_token().await?, Some("fresh-token".to_string()));
    assert_eq!(http.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn token_endpoint_failure_resolves_to_none() -> Result<(), Error> {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/nowtify-test.db", dir.path().display());
    let db = Database::new(&url).await?;
    db.migrate().await?;
    let config: Arc<dyn ConfigRepository> =
        Arc::new(SqliteConfigRepository::new(db.pool().clone()));
    config
        .set_api_credentials(&ApiCredentials {
            twitch_client_id: Some("cid".to_string()),
            twitch_client_secret: Some("secret".to_string()),
            youtube_api_key: None,
        })
        .await?;

    let http = Arc::new(CannedHttp::new(500, "oops"));
    let cache = TwitchTokenCache::new(http, config);
    assert_eq!(cache.get_token().await?, None);
    Ok(())
}

#[tokio::test]
async fn team_removal_and_negative_logo_cache() -> Result<(), Error> {
    let fx = fixture().await;

    fx.api.add_streamer(Platform::Twitch, "a", Some("squad".to_string())).await?;
    fx.api.add_streamer(Platform::Twitch, "b", Some("squad".to_string())).await?;
    fx.api.add_streamer(Platform::Twitch, "c", None).await?;

    let response = fx.api.handle(ApiRequest::RemoveTeam { team: "squad".to_string() }).await?;
    match response {
        ApiResponse::Removed { removed } => assert_eq!(removed, 2),
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(fx.streamers.list().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn team_logo_lookup_caches_negative_results() -> Result<(), Error> {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/nowtify-test.db", dir.path().display());
    let db = Database::new(&url).await?;
    db.migrate().await?;
    let pool = db.pool().clone();

    let streamers: Arc<dyn StreamerRepository> =
        Arc::new(SqliteStreamerRepository::new(pool.clone()));
    let config: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigRepository::new(pool.clone()));
    config
        .set_api_credentials(&ApiCredentials {
            twitch_client_id: Some("cid".to_string()),
            twitch_client_secret: Some("secret".to_string()),
            youtube_api_key: None,
        })
        .await?;
    config
        .set_twitch_token(&TwitchToken {
            access_token: "tok".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
        .await?;
    let logos: Arc<dyn TeamLogoRepository> =
        Arc::new(SqliteTeamLogoRepository::new(pool.clone()));

    // Teams endpoint answers "no such team" for every candidate name.
    let http = Arc::new(CannedHttp::new(200, r#"{"data": []}"#));
    let tokens = Arc::new(TwitchTokenCache::new(http.clone(), config.clone()));
    let twitch = Arc::new(TwitchPlatform::new(http.clone(), config.clone(), tokens));
    let teams = TeamService::new(streamers, logos.clone(), twitch);

    assert_eq!(teams.resolve_logo("No Such Team").await?, None);
    let calls_after_first = http.calls();
    assert!(calls_after_first > 0);

    // Second lookup is answered from the negative cache; zero requests.
    assert_eq!(teams.resolve_logo("No Such Team").await?, None);
    assert_eq!(http.calls(), calls_after_first);
    assert_eq!(logos.get("No Such Team").await?, Some(None));
    Ok(())
}
