// File: nowtify-core/src/platforms/mod.rs

use std::collections::HashMap;

use async_trait::async_trait;

use nowtify_common::models::streamer::{Candidate, LiveStatus};

/// Queries shorter than this return no candidates.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// One live-streaming service. Implementations never propagate network or
/// parse failures: a bad fetch resolves to the `check_failed` sentinel so
/// the rest of a sweep is unaffected.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamPlatform: Send + Sync {
    async fn check_live_status(&self, handle: &str) -> LiveStatus;

    /// Resolve many handles at once, keyed by lowercased handle. Handles
    /// missing from the platform's answer are explicitly not-live, never
    /// absent from the map. The default just loops `check_live_status`;
    /// platforms with a real batch endpoint override it.
    async fn check_live_batch(&self, handles: &[String]) -> HashMap<String, LiveStatus> {
        let mut results = HashMap::with_capacity(handles.len());
        for handle in handles {
            let status = self.check_live_status(handle).await;
            results.insert(handle.to_lowercase(), status);
        }
        results
    }

    /// Best-effort profile image lookup; `None` on any failure.
    async fn fetch_avatar(&self, handle: &str) -> Option<String>;

    /// Channel search, ranked live-first then by platform standing.
    async fn search(&self, query: &str) -> Vec<Candidate>;

    fn supports_batch(&self) -> bool {
        false
    }
}

/// Order candidates live-first, then by standing, then alphabetically so
/// result lists are stable.
pub fn rank_candidates(candidates: &mut Vec<Candidate>, cap: usize) {
    candidates.sort_by(|a, b| {
        b.is_live
            .cmp(&a.is_live)
            .then(b.rank.cmp(&a.rank))
            .then(a.handle.cmp(&b.handle))
    });
    candidates.truncate(cap);
}

pub mod twitch;
pub mod youtube;
pub mod kick;
pub mod manager;

#[cfg(test)]
mod tests {
    use super::*;
    use nowtify_common::models::platform::Platform;

    fn candidate(handle: &str, is_live: bool, rank: u8) -> Candidate {
        Candidate {
            platform: Platform::Twitch,
            handle: handle.to_string(),
            display_name: handle.to_string(),
            avatar_url: None,
            is_live,
            rank,
        }
    }

    #[test]
    fn ranking_puts_live_channels_first() {
        let mut list = vec![
            candidate("offline_partner", false, 2),
            candidate("live_pleb", true, 0),
            candidate("live_partner", true, 2),
        ];
        rank_candidates(&mut list, 10);
        assert_eq!(list[0].handle, "live_partner");
        assert_eq!(list[1].handle, "live_pleb");
        assert_eq!(list[2].handle, "offline_partner");
    }

    #[test]
    fn ranking_caps_results() {
        let mut list = (0..20).map(|i| candidate(&format!("c{i:02}"), false, 0)).collect::<Vec<_>>();
        rank_candidates(&mut list, 5);
        assert_eq!(list.len(), 5);
    }
}
