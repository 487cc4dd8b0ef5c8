//! nowtify-core/src/services/team_service.rs
//!
//! Team/group handling: bulk removal and the team logo lookup. Teams are
//! user-entered labels, so the logo resolver tries a bounded list of name
//! normalizations against the Twitch teams endpoint and remembers
//! negative outcomes.

use std::sync::Arc;

use tracing::debug;

use nowtify_common::traits::repository_traits::{StreamerRepository, TeamLogoRepository};

use crate::Error;
use crate::platforms::twitch::TwitchPlatform;

/// Ordered, deduplicated name variants to try. Bounded so a miss costs a
/// fixed number of requests.
fn name_candidates(team: &str) -> Vec<String> {
    let trimmed = team.trim();
    let lower = trimmed.to_lowercase();
    let raw = [
        trimmed.to_string(),
        lower.clone(),
        lower.replace(' ', ""),
        lower.replace(' ', "-"),
        lower.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
    ];

    let mut seen = Vec::new();
    for candidate in raw {
        if !candidate.is_empty() && !seen.contains(&candidate) {
            seen.push(candidate);
        }
    }
    seen
}

pub struct TeamService {
    streamers: Arc<dyn StreamerRepository>,
    logos: Arc<dyn TeamLogoRepository>,
    twitch: Arc<TwitchPlatform>,
}

impl TeamService {
    pub fn new(
        streamers: Arc<dyn StreamerRepository>,
        logos: Arc<dyn TeamLogoRepository>,
        twitch: Arc<TwitchPlatform>,
    ) -> Self {
        Self { streamers, logos, twitch }
    }

    /// Cached logo URL for a team, if any. A cached `None` means a
    /// previous lookup exhausted all candidates; it is not retried.
    pub async fn resolve_logo(&self, team: &str) -> Result<Option<String>, Error> {
        if let Some(cached) = self.logos.get(team).await? {
            return Ok(cached);
        }

        for candidate in name_candidates(team) {
            if let Some(url) = self.twitch.fetch_team_logo(&candidate).await {
                debug!("Team logo for '{team}' resolved via '{candidate}'");
                self.logos.set(team, Some(&url)).await?;
                return Ok(Some(url));
            }
        }

        debug!("No team logo found for '{team}'; caching negative result");
        self.logos.set(team, None).await?;
        Ok(None)
    }

    /// Delete a team: every member leaves the registry and the cached
    /// logo is evicted. Returns how many streamers were removed.
    pub async fn remove_team(&self, team: &str) -> Result<u64, Error> {
        let removed = self.streamers.remove_by_team(team).await?;
        self.logos.remove(team).await?;
        Ok(removed)
    }
}
