//! nowtify-core/src/services/scheduler.rs
//!
//! Per-streamer adaptive timers layered over the sweep service. Live
//! channels are re-checked every ~30s, recently-live every ~3min,
//! everything else rides the ~5min full sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use nowtify_common::models::streamer::PollTier;

use crate::Error;
use crate::services::sweep::{SweepService, SweepSummary};

pub struct AdaptiveScheduler {
    sweep: Arc<SweepService>,
    timers: DashMap<Uuid, JoinHandle<()>>,
    last_checked: DashMap<Uuid, Instant>,
}

impl AdaptiveScheduler {
    pub fn new(sweep: Arc<SweepService>) -> Arc<Self> {
        Arc::new(Self {
            sweep,
            timers: DashMap::new(),
            last_checked: DashMap::new(),
        })
    }

    pub fn sweep_service(&self) -> &Arc<SweepService> {
        &self.sweep
    }

    /// Run a full sweep, then retune every streamer's timer from its
    /// fresh tier. A sweep already in flight leaves the timers alone.
    pub async fn run_sweep_and_reschedule(self: &Arc<Self>) -> Result<SweepSummary, Error> {
        let summary = self.sweep.run_full_sweep().await?;
        if summary.skipped {
            return Ok(summary);
        }

        let now = Utc::now();
        for s in self.sweep.registry().list().await? {
            self.mark_checked(s.streamer_id);
            self.schedule_check(s.streamer_id, s.poll_tier(now).interval());
        }
        Ok(summary)
    }

    /// Arm (or re-arm) the timer for one streamer. Any existing timer is
    /// cancelled first, never left to fire stale. When the id was checked
    /// less than half of `after` ago and a timer is already pending, the
    /// pending one is kept; this damps the oscillation when a full sweep
    /// and an adaptive timer race on the same id.
    pub fn schedule_check(self: &Arc<Self>, streamer_id: Uuid, after: Duration) {
        if !after.is_zero() {
            if let Some(last) = self.last_checked.get(&streamer_id) {
                if last.elapsed() < after / 2 && self.timers.contains_key(&streamer_id) {
                    debug!("Keeping pending timer for {streamer_id}; checked too recently");
                    return;
                }
            }
        }

        if let Some((_, old_timer)) = self.timers.remove(&streamer_id) {
            old_timer.abort();
        }

        let scheduler = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            scheduler.timers.remove(&streamer_id);

            match scheduler.sweep.check_streamer(streamer_id).await {
                Ok(Some(merged)) => {
                    scheduler.mark_checked(streamer_id);
                    let tier = merged.poll_tier(Utc::now());
                    debug!(
                        "Adaptive check for {} -> live={} tier={:?}",
                        merged.handle, merged.status.is_live, tier
                    );
                    scheduler.schedule_check(streamer_id, tier.interval());
                }
                Ok(None) => {
                    // Streamer was removed; let the timer die with it.
                }
                Err(e) => {
                    error!("Adaptive check for {streamer_id} failed: {e}");
                    scheduler.schedule_check(streamer_id, PollTier::Slow.interval());
                }
            }
        });
        self.timers.insert(streamer_id, timer);
    }

    pub fn mark_checked(&self, streamer_id: Uuid) {
        self.last_checked.insert(streamer_id, Instant::now());
    }

    /// Drop the timer and bookkeeping for a removed streamer.
    pub fn cancel(&self, streamer_id: Uuid) {
        if let Some((_, timer)) = self.timers.remove(&streamer_id) {
            timer.abort();
        }
        self.last_checked.remove(&streamer_id);
        self.sweep.forget(streamer_id);
    }

    pub fn cancel_all(&self) {
        let ids: Vec<Uuid> = self.timers.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Number of armed timers; handy for observability and tests.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for AdaptiveScheduler {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
    }
}
