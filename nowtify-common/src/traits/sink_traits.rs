// File: nowtify-common/src/traits/sink_traits.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::platform::Platform;

/// Everything a user-visible "went live" notification needs to render.
#[derive(Debug, Clone)]
pub struct LiveNotification {
    pub streamer_id: Uuid,
    pub platform: Platform,
    pub handle: String,
    pub display_name: String,
    pub title: Option<String>,
    pub game: Option<String>,
    pub viewer_count: Option<u32>,
    pub avatar_url: Option<String>,
}

/// External collaborator that surfaces notifications to the user. The
/// core only knows this interface; the shipped default logs via tracing.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// `correlation_id` identifies the notification for click/dismiss
    /// callbacks routed back through the click registry.
    async fn notify_live(&self, correlation_id: &str, notification: &LiveNotification) -> Result<(), Error>;
}
