//! nowtify-core/src/auth/mod.rs
//!
//! Twitch app-access-token cache. The token is created lazily on first
//! need, reused until shortly before expiry, persisted so it survives a
//! restart, and dropped on a 401 or whenever credentials change.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use nowtify_common::models::config::TwitchToken;
use nowtify_common::traits::repository_traits::ConfigRepository;

use crate::Error;
use crate::http::HttpClient;

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Stop using a token this long before its actual expiry.
const SAFETY_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: u64,
}

pub struct TwitchTokenCache {
    http: Arc<dyn HttpClient>,
    config: Arc<dyn ConfigRepository>,
    // Single shared slot; holding the lock across a refresh means
    // concurrent callers wait on one in-flight request instead of racing.
    slot: Mutex<Option<TwitchToken>>,
}

impl TwitchTokenCache {
    pub fn new(http: Arc<dyn HttpClient>, config: Arc<dyn ConfigRepository>) -> Self {
        Self { http, config, slot: Mutex::new(None) }
    }

    /// Returns a usable bearer token, or `None` when no client secret is
    /// configured or the token endpoint fails. Callers treat `None` as
    /// "skip this check"; it never aborts a sweep.
    pub async fn get_token(&self) -> Result<Option<String>, Error> {
        let margin = Duration::seconds(SAFETY_MARGIN_SECS);
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_valid(Utc::now(), margin) {
                return Ok(Some(token.access_token.clone()));
            }
        }

        // Fall back to the persisted token from a previous run.
        if let Some(token) = self.config.get_twitch_token().await? {
            if token.is_valid(Utc::now(), margin) {
                let access = token.access_token.clone();
                *slot = Some(token);
                return Ok(Some(access));
            }
        }

        let creds = self.config.get_api_credentials().await?;
        let (client_id, client_secret) = match (creds.twitch_client_id, creds.twitch_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => {
                debug!("No Twitch client id/secret configured; skipping token request");
                return Ok(None);
            }
        };

        let form = vec![
            ("client_id".to_string(), client_id),
            ("client_secret".to_string(), client_secret),
            ("grant_type".to_string(), "client_credentials".to_string()),
        ];

        let response = match self.http.post_form(TOKEN_URL, &form).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Twitch token request failed: {e}");
                return Ok(None);
            }
        };
        if !response.is_success() {
            warn!("Twitch token endpoint returned HTTP {}", response.status);
            return Ok(None);
        }

        let parsed: TokenEndpointResponse = match serde_json::from_str(&response.body) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not parse Twitch token response: {e}");
                return Ok(None);
            }
        };

        let token = TwitchToken {
            access_token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in as i64),
        };
        self.config.set_twitch_token(&token).await?;

        let access = token.access_token.clone();
        *slot = Some(token);
        Ok(Some(access))
    }

    /// Drop the cached and persisted token. Called on a 401 and whenever
    /// credentials change; the next `get_token` requests a fresh one.
    pub async fn invalidate(&self) -> Result<(), Error> {
        let mut slot = self.slot.lock().await;
        *slot = None;
        self.config.clear_twitch_token().await?;
        debug!("Twitch token invalidated");
        Ok(())
    }
}
