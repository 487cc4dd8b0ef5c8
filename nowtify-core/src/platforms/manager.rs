// File: nowtify-core/src/platforms/manager.rs

use std::sync::Arc;

use nowtify_common::models::platform::Platform;
use nowtify_common::models::streamer::Candidate;

use crate::platforms::{StreamPlatform, MIN_SEARCH_QUERY_LEN};

/// Holds one adapter per platform and routes by the `Platform` variant,
/// replacing string-keyed dispatch with a closed set chosen once per call.
pub struct PlatformManager {
    twitch: Arc<dyn StreamPlatform>,
    youtube: Arc<dyn StreamPlatform>,
    kick: Arc<dyn StreamPlatform>,
}

impl PlatformManager {
    pub fn new(
        twitch: Arc<dyn StreamPlatform>,
        youtube: Arc<dyn StreamPlatform>,
        kick: Arc<dyn StreamPlatform>,
    ) -> Self {
        Self { twitch, youtube, kick }
    }

    pub fn adapter(&self, platform: Platform) -> &Arc<dyn StreamPlatform> {
        match platform {
            Platform::Twitch => &self.twitch,
            Platform::Youtube => &self.youtube,
            Platform::Kick => &self.kick,
        }
    }

    /// Search one platform, or all of them when `platform` is None.
    /// Short queries resolve to an empty candidate list, not an error.
    pub async fn search(&self, query: &str, platform: Option<Platform>) -> Vec<Candidate> {
        let query = query.trim();
        if query.len() < MIN_SEARCH_QUERY_LEN {
            return Vec::new();
        }

        match platform {
            Some(p) => self.adapter(p).search(query).await,
            None => {
                let (mut tw, yt, kick) = tokio::join!(
                    self.twitch.search(query),
                    self.youtube.search(query),
                    self.kick.search(query),
                );
                tw.extend(yt);
                tw.extend(kick);
                tw
            }
        }
    }
}
