//! nowtify-core/src/services/sweep.rs
//!
//! One full pass over every tracked streamer. Platforms with a batch
//! endpoint get a single request per sweep; the rest fan out
//! concurrently. Registry writes are serialized per streamer id so a
//! racing adaptive check and full sweep cannot clobber each other's
//! merge.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nowtify_common::models::platform::Platform;
use nowtify_common::models::streamer::{LiveStatus, Streamer, StreamerPatch};
use nowtify_common::traits::repository_traits::StreamerRepository;

use crate::Error;
use crate::eventbus::{EventBus, StreamEvent};
use crate::platforms::manager::PlatformManager;
use crate::services::reconciler::reconcile;

#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub checked: usize,
    pub live: usize,
    pub errors: usize,
    /// Set when another sweep was already running and this call did
    /// nothing.
    pub skipped: bool,
}

impl SweepSummary {
    fn skipped() -> Self {
        Self { skipped: true, ..Self::default() }
    }
}

/// Releases the in-flight flag on every exit path, early `?` included.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SweepService {
    streamers: Arc<dyn StreamerRepository>,
    platforms: Arc<PlatformManager>,
    event_bus: Arc<EventBus>,
    in_flight: AtomicBool,
    id_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl SweepService {
    pub fn new(
        streamers: Arc<dyn StreamerRepository>,
        platforms: Arc<PlatformManager>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            streamers,
            platforms,
            event_bus,
            in_flight: AtomicBool::new(false),
            id_locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<dyn StreamerRepository> {
        &self.streamers
    }

    /// Check every tracked streamer once. Reentrant-safe: a call while a
    /// sweep is already running is a no-op, not queued.
    pub async fn run_full_sweep(&self) -> Result<SweepSummary, Error> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sweep already in flight; ignoring concurrent request");
            return Ok(SweepSummary::skipped());
        }
        let _guard = SweepGuard(&self.in_flight);

        let streamers = self.streamers.list().await?;
        if streamers.is_empty() {
            self.event_bus
                .publish(StreamEvent::SweepCompleted { checked: 0, live: 0, errors: 0 })
                .await;
            return Ok(SweepSummary::default());
        }

        let mut by_platform: HashMap<Platform, Vec<Streamer>> = HashMap::new();
        for s in streamers {
            by_platform.entry(s.platform).or_default().push(s);
        }

        // One future per platform group; batch-capable platforms resolve
        // their whole group with a single request.
        let mut group_futures: Vec<BoxFuture<'_, Vec<(Uuid, LiveStatus)>>> = Vec::new();
        for (platform, group) in by_platform {
            let adapter = Arc::clone(self.platforms.adapter(platform));
            if adapter.supports_batch() {
                group_futures.push(
                    async move {
                        let handles: Vec<String> =
                            group.iter().map(|s| s.handle.clone()).collect();
                        let mut statuses = adapter.check_live_batch(&handles).await;
                        group
                            .into_iter()
                            .map(|s| {
                                let status = statuses
                                    .remove(&s.handle.to_lowercase())
                                    .unwrap_or_else(LiveStatus::check_failed);
                                (s.streamer_id, status)
                            })
                            .collect()
                    }
                    .boxed(),
                );
            } else {
                group_futures.push(
                    async move {
                        let checks = group.iter().map(|s| {
                            let adapter = Arc::clone(&adapter);
                            async move {
                                (s.streamer_id, adapter.check_live_status(&s.handle).await)
                            }
                        });
                        join_all(checks).await
                    }
                    .boxed(),
                );
            }
        }

        let results: Vec<(Uuid, LiveStatus)> =
            join_all(group_futures).await.into_iter().flatten().collect();

        let mut summary = SweepSummary::default();
        summary.checked = results.len();

        let merges = results
            .into_iter()
            .map(|(id, fresh)| self.finish_check(id, fresh));
        for merged in join_all(merges).await {
            match merged {
                Ok(Some(s)) => {
                    if s.status.is_live {
                        summary.live += 1;
                    }
                    if s.status.error {
                        summary.errors += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to persist check result: {e}");
                    summary.errors += 1;
                }
            }
        }

        info!(
            "Sweep complete: {} checked, {} live, {} error(s)",
            summary.checked, summary.live, summary.errors
        );
        self.event_bus
            .publish(StreamEvent::SweepCompleted {
                checked: summary.checked,
                live: summary.live,
                errors: summary.errors,
            })
            .await;

        Ok(summary)
    }

    /// Adaptive single check, used by the per-streamer timers.
    pub async fn check_streamer(&self, streamer_id: Uuid) -> Result<Option<Streamer>, Error> {
        let Some(s) = self.streamers.get(streamer_id).await? else {
            return Ok(None);
        };
        let fresh = self
            .platforms
            .adapter(s.platform)
            .check_live_status(&s.handle)
            .await;
        self.finish_check(streamer_id, fresh).await
    }

    /// Reconcile and persist one fetched status under that id's lock.
    /// The registry row is re-read after the lock is taken so the merge
    /// always starts from the freshest stored state.
    async fn finish_check(
        &self,
        streamer_id: Uuid,
        fresh: LiveStatus,
    ) -> Result<Option<Streamer>, Error> {
        let lock = self
            .id_locks
            .entry(streamer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _held = lock.lock().await;

        let Some(old) = self.streamers.get(streamer_id).await? else {
            // Removed while the fetch was in flight.
            return Ok(None);
        };

        let now = Utc::now();
        let reconciled = reconcile(&old, fresh, now);

        let mut patch = StreamerPatch {
            status: Some(reconciled.merged.status.clone()),
            last_checked_at: Some(now),
            ..StreamerPatch::default()
        };

        // Out-of-band avatar enrichment; a failure just leaves the field
        // empty and never blocks the merge.
        if old.avatar_url.is_none() {
            if let Some(url) = self
                .platforms
                .adapter(old.platform)
                .fetch_avatar(&old.handle)
                .await
            {
                patch.avatar_url = Some(url);
            }
        }

        self.streamers.patch(streamer_id, &patch).await?;

        for event in reconciled.events {
            self.event_bus.publish(event).await;
        }
        Ok(Some(reconciled.merged))
    }

    /// Forget the write lock for a removed streamer.
    pub fn forget(&self, streamer_id: Uuid) {
        self.id_locks.remove(&streamer_id);
    }
}
