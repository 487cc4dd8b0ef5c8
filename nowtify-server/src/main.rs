// File: nowtify-server/src/main.rs

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nowtify_common::traits::repository_traits::{
    ConfigRepository, HistoryRepository, StreamerRepository, TeamLogoRepository,
};
use nowtify_core::auth::TwitchTokenCache;
use nowtify_core::db::Database;
use nowtify_core::eventbus::history_logger::spawn_history_logger;
use nowtify_core::eventbus::EventBus;
use nowtify_core::http::DefaultHttpClient;
use nowtify_core::platforms::kick::KickPlatform;
use nowtify_core::platforms::manager::PlatformManager;
use nowtify_core::platforms::twitch::TwitchPlatform;
use nowtify_core::platforms::youtube::YoutubePlatform;
use nowtify_core::repositories::{
    SqliteConfigRepository, SqliteHistoryRepository, SqliteStreamerRepository,
    SqliteTeamLogoRepository,
};
use nowtify_core::services::notifier::{
    spawn_notifier_task, NotificationRegistry, TracingNotificationSink,
};
use nowtify_core::services::scheduler::AdaptiveScheduler;
use nowtify_core::services::sweep::SweepService;
use nowtify_core::services::team_service::TeamService;
use nowtify_core::services::api::ApiService;
use nowtify_core::tasks::poller::spawn_polling_task;
use nowtify_core::Error;

#[derive(Parser, Debug, Clone)]
#[command(name = "nowtify")]
#[command(author, version, about = "Nowtify - live-status polling daemon for Twitch/YouTube/Kick")]
struct Args {
    /// SQLite database URL.
    #[arg(long, default_value = "sqlite://nowtify.db")]
    database_url: String,

    /// Full-sweep cadence in minutes (overridden by stored settings).
    #[arg(long, default_value_t = 5)]
    interval_minutes: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("Starting nowtify...");

    let db = Database::new(&args.database_url).await?;
    db.migrate().await?;
    let pool = db.pool().clone();

    let streamers: Arc<dyn StreamerRepository> =
        Arc::new(SqliteStreamerRepository::new(pool.clone()));
    let config: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigRepository::new(pool.clone()));
    let history: Arc<dyn HistoryRepository> = Arc::new(SqliteHistoryRepository::new(pool.clone()));
    let team_logos: Arc<dyn TeamLogoRepository> =
        Arc::new(SqliteTeamLogoRepository::new(pool.clone()));

    let http = Arc::new(DefaultHttpClient::new());
    let tokens = Arc::new(TwitchTokenCache::new(http.clone(), config.clone()));

    let twitch = Arc::new(TwitchPlatform::new(http.clone(), config.clone(), tokens.clone()));
    let youtube = Arc::new(YoutubePlatform::new(http.clone(), config.clone()));
    let kick = Arc::new(KickPlatform::new(http.clone()));
    let platforms = Arc::new(PlatformManager::new(twitch.clone(), youtube, kick));

    let event_bus = Arc::new(EventBus::new());
    let sweep = Arc::new(SweepService::new(
        streamers.clone(),
        platforms.clone(),
        event_bus.clone(),
    ));
    let scheduler = AdaptiveScheduler::new(sweep);
    let teams = Arc::new(TeamService::new(streamers.clone(), team_logos, twitch));

    // Sinks for went-live events.
    let registry = Arc::new(NotificationRegistry::new());
    let history_task = spawn_history_logger(event_bus.clone(), history.clone());
    let notifier_task = spawn_notifier_task(
        event_bus.clone(),
        Arc::new(TracingNotificationSink),
        config.clone(),
        registry,
    );

    // Stored settings win over the CLI default for the sweep cadence.
    let minutes = match config.get_settings().await {
        Ok(settings) => settings.refresh_minutes.max(1),
        Err(e) => {
            error!("Could not load settings, using CLI cadence: {e}");
            args.interval_minutes.max(1)
        }
    };
    let (alarm_tx, alarm_rx) = watch::channel(Duration::from_secs(u64::from(minutes) * 60));

    // The message surface; a front-end transport (popup bridge, IPC,
    // local socket) calls `handle` on this.
    let _api = Arc::new(ApiService::new(
        streamers,
        config,
        history,
        platforms,
        tokens,
        scheduler.clone(),
        teams,
        alarm_tx,
    ));

    let poller_task = spawn_polling_task(scheduler, event_bus.clone(), alarm_rx);

    info!("nowtify running; sweeping every {minutes} minute(s). Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    event_bus.shutdown();
    let _ = tokio::time::timeout(
        Duration::from_secs(5),
        async { let _ = tokio::join!(poller_task, history_task, notifier_task); },
    )
    .await;

    info!("Goodbye.");
    Ok(())
}
