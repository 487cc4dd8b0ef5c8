//! nowtify-core/src/services/notifier.rs
//!
//! Bus subscriber that turns WentLive events into user-visible
//! notifications, honoring the notifications toggle. Click targets are
//! tracked by correlation id and removed deterministically when
//! consumed, so no handler outlives its notification.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, error, info};
use uuid::Uuid;

use nowtify_common::traits::repository_traits::ConfigRepository;
use nowtify_common::traits::sink_traits::{LiveNotification, NotificationSink};

use crate::Error;
use crate::eventbus::{EventBus, StreamEvent};

/// Pending click target for one raised notification.
#[derive(Debug, Clone)]
struct PendingClick {
    url: String,
}

/// Maps correlation ids to stream URLs until the notification is clicked
/// or dismissed.
#[derive(Default)]
pub struct NotificationRegistry {
    pending: DashMap<String, PendingClick>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a click target and returns its correlation id.
    pub fn register(&self, notification: &LiveNotification) -> String {
        let correlation_id = format!("live-{}-{}", notification.streamer_id, Uuid::new_v4());
        let url = notification.platform.stream_url(&notification.handle);
        self.pending.insert(correlation_id.clone(), PendingClick { url });
        correlation_id
    }

    /// Consume a click: returns the stream URL to open and forgets the id.
    pub fn on_clicked(&self, correlation_id: &str) -> Option<String> {
        self.pending.remove(correlation_id).map(|(_, p)| p.url)
    }

    /// A dismissed notification just drops its entry.
    pub fn on_dismissed(&self, correlation_id: &str) {
        self.pending.remove(correlation_id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Default sink: writes the notification to the log. Real front-ends
/// provide their own `NotificationSink`.
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify_live(&self, correlation_id: &str, n: &LiveNotification) -> Result<(), Error> {
        info!(
            "{} is now live on {} ({}): {}",
            n.display_name,
            n.platform,
            correlation_id,
            n.title.as_deref().unwrap_or("no title"),
        );
        Ok(())
    }
}

pub fn spawn_notifier_task(
    event_bus: Arc<EventBus>,
    sink: Arc<dyn NotificationSink>,
    config: Arc<dyn ConfigRepository>,
    registry: Arc<NotificationRegistry>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = event_bus.subscribe(None).await;
        let mut shutdown_rx = event_bus.shutdown_rx.clone();

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    let StreamEvent::WentLive { notification, .. } = event else { continue };

                    let notifications_on = config
                        .get_settings()
                        .await
                        .map(|s| s.notifications)
                        .unwrap_or(true);
                    if !notifications_on {
                        debug!("Notifications disabled; suppressing {}", notification.display_name);
                        continue;
                    }

                    let correlation_id = registry.register(&notification);
                    if let Err(e) = sink.notify_live(&correlation_id, &notification).await {
                        error!("Notification sink failed: {e}");
                        registry.on_dismissed(&correlation_id);
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Notifier task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowtify_common::models::platform::Platform;

    fn notification(platform: Platform, handle: &str) -> LiveNotification {
        LiveNotification {
            streamer_id: Uuid::new_v4(),
            platform,
            handle: handle.to_string(),
            display_name: handle.to_string(),
            title: None,
            game: None,
            viewer_count: None,
            avatar_url: None,
        }
    }

    #[test]
    fn click_consumes_registration() {
        let registry = NotificationRegistry::new();
        let id = registry.register(&notification(Platform::Twitch, "alice"));
        assert_eq!(registry.pending_count(), 1);

        assert_eq!(registry.on_clicked(&id), Some("https://twitch.tv/alice".to_string()));
        assert_eq!(registry.pending_count(), 0);
        // Second click on the same id finds nothing.
        assert_eq!(registry.on_clicked(&id), None);
    }

    #[test]
    fn dismissal_clears_entry() {
        let registry = NotificationRegistry::new();
        let id = registry.register(&notification(Platform::Kick, "bob"));
        registry.on_dismissed(&id);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn youtube_click_targets_live_page() {
        let registry = NotificationRegistry::new();
        let id = registry.register(&notification(Platform::Youtube, "@somechan"));
        assert_eq!(
            registry.on_clicked(&id),
            Some("https://youtube.com/@somechan/live".to_string())
        );
    }
}
