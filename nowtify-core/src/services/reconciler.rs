//! nowtify-core/src/services/reconciler.rs
//!
//! Merges a freshly fetched status into the durable streamer record and
//! decides which observable side effects fire. Pure: no I/O, no clocks;
//! the caller supplies `now`.

use chrono::{DateTime, Utc};

use nowtify_common::models::history::HistoryEntry;
use nowtify_common::models::streamer::{LiveStatus, Streamer};
use nowtify_common::traits::sink_traits::LiveNotification;

use crate::eventbus::StreamEvent;

#[derive(Debug)]
pub struct Reconciled {
    pub merged: Streamer,
    pub events: Vec<StreamEvent>,
}

fn notification_for(merged: &Streamer) -> LiveNotification {
    LiveNotification {
        streamer_id: merged.streamer_id,
        platform: merged.platform,
        handle: merged.handle.clone(),
        display_name: merged.display_name.clone(),
        title: merged.status.title.clone(),
        game: merged.status.game.clone(),
        viewer_count: merged.status.viewer_count,
        avatar_url: merged.avatar_url.clone(),
    }
}

fn history_for(merged: &Streamer, now: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        streamer_id: merged.streamer_id,
        name: merged.display_name.clone(),
        platform: merged.platform,
        title: merged.status.title.clone(),
        game: merged.status.game.clone(),
        viewer_count: merged.status.viewer_count,
        duration_secs: None,
        timestamp: now,
    }
}

/// Fold `fresh` into `old`.
///
/// - A failed check keeps the prior status (error flag aside) and emits
///   nothing; `last_live_date` is untouched.
/// - offline -> live is the unique notification trigger: sets
///   `last_live_date`, clears `ended_at`.
/// - live -> offline stamps `ended_at`, keeps `last_live_date`, and
///   carries the session duration for the history sink. No notification.
/// - No transition: the status block is refreshed, session bookkeeping
///   (`started_at`/`ended_at`/`last_live_date`) carries over.
pub fn reconcile(old: &Streamer, fresh: LiveStatus, now: DateTime<Utc>) -> Reconciled {
    let mut merged = old.clone();
    merged.last_checked_at = Some(now);

    if fresh.error {
        merged.status.error = true;
        return Reconciled { merged, events: vec![] };
    }

    let was_live = old.status.is_live;
    let mut events = Vec::new();

    match (was_live, fresh.is_live) {
        (false, true) => {
            let mut status = fresh;
            status.started_at = status.started_at.or(Some(now));
            status.ended_at = None;
            status.last_live_date = Some(now);
            status.error = false;
            merged.status = status;

            events.push(StreamEvent::WentLive {
                notification: notification_for(&merged),
                history: history_for(&merged, now),
            });
        }
        (true, false) => {
            let started_at = old.status.started_at;
            let mut status = fresh;
            status.started_at = started_at;
            status.ended_at = Some(now);
            status.last_live_date = old.status.last_live_date;
            status.error = false;
            merged.status = status;

            events.push(StreamEvent::WentOffline {
                streamer_id: merged.streamer_id,
                ended_at: now,
                duration_secs: started_at.map(|s| (now - s).num_seconds()),
            });
        }
        (true, true) => {
            let mut status = fresh;
            status.started_at = status.started_at.or(old.status.started_at);
            status.ended_at = None;
            status.last_live_date = old.status.last_live_date;
            status.error = false;
            merged.status = status;
        }
        (false, false) => {
            let mut status = fresh;
            status.started_at = old.status.started_at;
            status.ended_at = old.status.ended_at;
            status.last_live_date = old.status.last_live_date;
            status.error = false;
            merged.status = status;
        }
    }

    Reconciled { merged, events }
}
