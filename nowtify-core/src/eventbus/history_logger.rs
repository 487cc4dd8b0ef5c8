//! nowtify-core/src/eventbus/history_logger.rs
//!
//! Bus subscriber that persists the history ring: appends on WentLive,
//! backfills the session duration on WentOffline.

use std::sync::Arc;

use tracing::{debug, error};

use nowtify_common::traits::repository_traits::HistoryRepository;

use crate::eventbus::{EventBus, StreamEvent};

pub fn spawn_history_logger(
    event_bus: Arc<EventBus>,
    history: Arc<dyn HistoryRepository>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = event_bus.subscribe(None).await;
        let mut shutdown_rx = event_bus.shutdown_rx.clone();

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    match event {
                        StreamEvent::WentLive { history: entry, .. } => {
                            if let Err(e) = history.append(&entry).await {
                                error!("Failed to append history entry: {e}");
                            } else {
                                debug!("History entry recorded for {}", entry.name);
                            }
                        }
                        StreamEvent::WentOffline { streamer_id, duration_secs: Some(secs), .. } => {
                            if let Err(e) = history.set_last_duration(streamer_id, secs).await {
                                error!("Failed to backfill history duration: {e}");
                            }
                        }
                        _ => {}
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("History logger stopped");
    })
}
