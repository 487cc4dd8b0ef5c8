//! nowtify-core/src/eventbus/mod.rs
//!
//! In-process event bus with guaranteed delivery to multiple subscribers
//! via bounded MPSC queues. The notifier and history sinks subscribe here
//! so the sweep never talks to them directly.

pub mod history_logger;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use uuid::Uuid;

use nowtify_common::models::history::HistoryEntry;
use nowtify_common::traits::sink_traits::LiveNotification;

/// Everything the polling core publishes.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A tracked channel transitioned offline -> live. The unique trigger
    /// for a notification.
    WentLive {
        notification: LiveNotification,
        history: HistoryEntry,
    },

    /// A tracked channel transitioned live -> offline.
    WentOffline {
        streamer_id: Uuid,
        ended_at: DateTime<Utc>,
        duration_secs: Option<i64>,
    },

    /// A full sweep finished (successfully or partially).
    SweepCompleted {
        checked: usize,
        live: usize,
        errors: usize,
    },
}

impl StreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::WentLive { .. } => "stream.online",
            StreamEvent::WentOffline { .. } => "stream.offline",
            StreamEvent::SweepCompleted { .. } => "sweep.completed",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender` for guaranteed delivery;
/// a full buffer applies backpressure to `publish` rather than dropping.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<StreamEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

const DEFAULT_BUFFER_SIZE: usize = 512;

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<StreamEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: StreamEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
