//! Direct media download with a browser-like identity.

use std::time::Duration;

use async_trait::async_trait;

use super::error::FallbackResult;

/// Some CDNs refuse obviously non-browser clients; present a plain desktop
/// identity when fetching candidate media.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FallbackResult<Vec<u8>>;
}

pub struct HttpMediaFetcher {
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> FallbackResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
