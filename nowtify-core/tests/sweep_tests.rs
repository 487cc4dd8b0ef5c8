// File: nowtify-core/tests/sweep_tests.rs
//
// Sweep and scheduler behavior with scripted platform adapters: mutual
// exclusion, transition events, error isolation, batch dispatch.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use nowtify_common::models::platform::Platform;
use nowtify_common::models::streamer::{Candidate, LiveStatus, Streamer};
use nowtify_common::traits::repository_traits::StreamerRepository;
use nowtify_core::db::Database;
use nowtify_core::eventbus::{EventBus, StreamEvent};
use nowtify_core::platforms::manager::PlatformManager;
use nowtify_core::platforms::StreamPlatform;
use nowtify_core::repositories::SqliteStreamerRepository;
use nowtify_core::services::scheduler::AdaptiveScheduler;
use nowtify_core::services::sweep::SweepService;
use nowtify_core::Error;

/// Adapter fed from per-handle response queues. Once a queue runs dry the
/// handle reads as offline. Counts how many network-shaped calls happen.
#[derive(Default)]
struct ScriptedPlatform {
    scripts: StdMutex<HashMap<String, VecDeque<LiveStatus>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    batch: bool,
}

impl ScriptedPlatform {
    fn new() -> Self {
        Self::default()
    }

    fn batching() -> Self {
        Self { batch: true, ..Self::default() }
    }

    fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    fn push(&self, handle: &str, status: LiveStatus) {
        self.scripts
            .lock()
            .unwrap()
            .entry(handle.to_lowercase())
            .or_default()
            .push_back(status);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_for(&self, handle: &str) -> LiveStatus {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&handle.to_lowercase())
            .and_then(|q| q.pop_front())
            .unwrap_or_else(LiveStatus::offline)
    }
}

#[async_trait]
impl StreamPlatform for ScriptedPlatform {
    async fn check_live_status(&self, handle: &str) -> LiveStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_for(handle)
    }

    async fn check_live_batch(&self, handles: &[String]) -> HashMap<String, LiveStatus> {
        if !self.batch {
            let mut out = HashMap::new();
            for h in handles {
                out.insert(h.to_lowercase(), self.check_live_status(h).await);
            }
            return out;
        }
        // One "request" regardless of how many handles.
        self.calls.fetch_add(1, Ordering::SeqCst);
        handles
            .iter()
            .map(|h| (h.to_lowercase(), self.next_for(h)))
            .collect()
    }

    async fn fetch_avatar(&self, _handle: &str) -> Option<String> {
        None
    }

    async fn search(&self, _query: &str) -> Vec<Candidate> {
        Vec::new()
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    streamers: Arc<dyn StreamerRepository>,
    platform: Arc<ScriptedPlatform>,
    event_bus: Arc<EventBus>,
    sweep: Arc<SweepService>,
}

async fn fixture(platform: ScriptedPlatform) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/nowtify-test.db", dir.path().display());
    let db = Database::new(&url).await.expect("open db");
    db.migrate().await.expect("migrate");

    let streamers: Arc<dyn StreamerRepository> =
        Arc::new(SqliteStreamerRepository::new(db.pool().clone()));
    let platform = Arc::new(platform);
    let idle = Arc::new(ScriptedPlatform::new());
    let manager = Arc::new(PlatformManager::new(
        platform.clone(),
        idle.clone(),
        idle,
    ));
    let event_bus = Arc::new(EventBus::new());
    let sweep = Arc::new(SweepService::new(
        streamers.clone(),
        manager,
        event_bus.clone(),
    ));

    Fixture { _dir: dir, streamers, platform, event_bus, sweep }
}

async fn track(fx: &Fixture, handle: &str) -> Uuid {
    let s = Streamer::new(Platform::Twitch, handle);
    fx.streamers.upsert(&s).await.expect("upsert");
    s.streamer_id
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn live(title: &str) -> LiveStatus {
    LiveStatus {
        is_live: true,
        title: Some(title.to_string()),
        viewer_count: Some(100),
        ..LiveStatus::offline()
    }
}

#[tokio::test]
async fn concurrent_sweeps_run_exactly_once() -> Result<(), Error> {
    let fx = fixture(ScriptedPlatform::with_delay(Duration::from_millis(100))).await;
    track(&fx, "alice").await;
    track(&fx, "bob").await;

    let (first, second) = tokio::join!(fx.sweep.run_full_sweep(), fx.sweep.run_full_sweep());
    let (first, second) = (first?, second?);

    assert_ne!(first.skipped, second.skipped, "exactly one sweep must run");
    // One network call per streamer, from the single sweep that ran.
    assert_eq!(fx.platform.calls(), 2);

    // Once the guard is released a new sweep goes through again.
    let third = fx.sweep.run_full_sweep().await?;
    assert!(!third.skipped);
    assert_eq!(fx.platform.calls(), 4);
    Ok(())
}

#[tokio::test]
async fn live_transition_scenario_fires_single_notification() -> Result<(), Error> {
    let fx = fixture(ScriptedPlatform::new()).await;
    let alice = track(&fx, "alice").await;

    // Scripted checks: offline, then live "Ranked", then offline again.
    fx.platform.push("alice", LiveStatus::offline());
    fx.platform.push("alice", live("Ranked"));
    fx.platform.push("alice", LiveStatus::offline());

    let mut rx = fx.event_bus.subscribe(None).await;

    // Check 1: still offline, nothing to announce.
    let summary = fx.sweep.run_full_sweep().await?;
    assert_eq!((summary.checked, summary.live), (1, 0));
    let events = drain(&mut rx);
    assert!(events.iter().all(|e| matches!(e, StreamEvent::SweepCompleted { .. })));

    // Check 2: alice went live.
    let summary = fx.sweep.run_full_sweep().await?;
    assert_eq!(summary.live, 1);
    let events = drain(&mut rx);
    let went_live: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::WentLive { .. }))
        .collect();
    assert_eq!(went_live.len(), 1, "exactly one notification per transition");
    match went_live[0] {
        StreamEvent::WentLive { notification, history } => {
            assert_eq!(notification.title.as_deref(), Some("Ranked"));
            assert_eq!(history.duration_secs, None);
        }
        _ => unreachable!(),
    }

    let stored = fx.streamers.get(alice).await?.unwrap();
    assert!(stored.status.is_live);
    assert_eq!(stored.status.title.as_deref(), Some("Ranked"));
    assert!(stored.status.last_live_date.is_some());
    assert!(stored.status.ended_at.is_none());

    // Check 3: alice went offline; ended_at set, no new notification.
    fx.sweep.run_full_sweep().await?;
    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::WentLive { .. })));
    assert!(events.iter().any(|e| matches!(e, StreamEvent::WentOffline { .. })));

    let stored = fx.streamers.get(alice).await?.unwrap();
    assert!(!stored.status.is_live);
    assert!(stored.status.ended_at.is_some());
    assert!(stored.status.was_live_recently(Utc::now()));
    Ok(())
}

#[tokio::test]
async fn one_failing_streamer_never_blocks_siblings() -> Result<(), Error> {
    let fx = fixture(ScriptedPlatform::new()).await;
    let good = track(&fx, "good").await;
    let bad = track(&fx, "bad").await;

    fx.platform.push("good", live("all fine"));
    fx.platform.push("bad", LiveStatus::check_failed());

    let summary = fx.sweep.run_full_sweep().await?;
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.live, 1);
    assert_eq!(summary.errors, 1);

    let good = fx.streamers.get(good).await?.unwrap();
    assert!(good.status.is_live);

    let bad = fx.streamers.get(bad).await?.unwrap();
    assert!(bad.status.error);
    assert!(!bad.status.is_live);
    Ok(())
}

#[tokio::test]
async fn failed_check_keeps_known_good_fields() -> Result<(), Error> {
    let fx = fixture(ScriptedPlatform::new()).await;
    let alice = track(&fx, "alice").await;

    fx.platform.push("alice", live("Ranked"));
    fx.platform.push("alice", LiveStatus::check_failed());

    fx.sweep.run_full_sweep().await?;
    fx.sweep.run_full_sweep().await?;

    let stored = fx.streamers.get(alice).await?.unwrap();
    assert!(stored.status.error);
    // The failed check left the last known-good snapshot in place.
    assert!(stored.status.is_live);
    assert_eq!(stored.status.title.as_deref(), Some("Ranked"));
    Ok(())
}

#[tokio::test]
async fn batch_platform_is_asked_once_per_sweep() -> Result<(), Error> {
    let fx = fixture(ScriptedPlatform::batching()).await;
    track(&fx, "a").await;
    let b = track(&fx, "b").await;
    track(&fx, "c").await;

    fx.platform.push("a", live("one"));
    fx.platform.push("c", live("three"));

    let summary = fx.sweep.run_full_sweep().await?;
    assert_eq!(summary.checked, 3);
    assert_eq!(summary.live, 2);
    // Three streamers, one request.
    assert_eq!(fx.platform.calls(), 1);

    // The handle missing from the live set is explicitly offline.
    let stored = fx.streamers.get(b).await?.unwrap();
    assert!(!stored.status.is_live);
    assert!(!stored.status.error);
    assert!(stored.last_checked_at.is_some());
    Ok(())
}

#[tokio::test]
async fn scheduler_arms_cancels_and_damps_timers() -> Result<(), Error> {
    let fx = fixture(ScriptedPlatform::new()).await;
    let alice = track(&fx, "alice").await;

    let scheduler = AdaptiveScheduler::new(fx.sweep.clone());

    // Far-future timer, then a second request for the same id right after
    // a recorded check: the pending timer is kept, not doubled.
    scheduler.mark_checked(alice);
    scheduler.schedule_check(alice, Duration::from_secs(300));
    assert_eq!(scheduler.active_timers(), 1);
    scheduler.schedule_check(alice, Duration::from_secs(300));
    assert_eq!(scheduler.active_timers(), 1);

    scheduler.cancel(alice);
    assert_eq!(scheduler.active_timers(), 0);

    // An immediate check is never damped.
    fx.platform.push("alice", live("go"));
    scheduler.schedule_check(alice, Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fx.platform.calls(), 1);

    let stored = fx.streamers.get(alice).await?.unwrap();
    assert!(stored.status.is_live);

    scheduler.cancel_all();
    assert_eq!(scheduler.active_timers(), 0);
    Ok(())
}
