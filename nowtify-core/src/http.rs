//! HTTP client abstraction for the platform adapters.
//!
//! Adapters talk to this trait instead of reqwest directly so tests can
//! substitute canned responses without a network. Unlike a plain body
//! fetch, responses carry the status code: the Twitch adapter needs to
//! see 401s to invalidate its token.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::Error;

/// All outbound requests share one bounded timeout so a stuck fetch can
/// never starve a polling tier's cadence.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: &HashMap<String, String>) -> Result<HttpResponse, Error>;

    /// `application/x-www-form-urlencoded` POST, used by the token endpoint.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for DefaultHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn get(&self, url: &str, headers: &HashMap<String, String>) -> Result<HttpResponse, Error> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse, Error> {
        let response = self.client.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
