//! REST client for the headless-browser capability.
//!
//! The upstream service exposes `scrape`, `screenshot`, and `content`
//! actions. Navigation runs under the service's own timeout; the client
//! applies an explicit request timeout on top so a stuck upstream can never
//! hold a handler open.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::BrowserlessSection;

use super::error::{FallbackError, FallbackResult};

/// Navigation timeout passed to the browser service, milliseconds.
pub const NAVIGATION_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScrapeSelector {
    pub selector: &'static str,
    pub property: &'static str,
}

/// Selector/attribute pairs likely to expose a direct video source.
pub const MEDIA_SELECTORS: &[ScrapeSelector] = &[
    ScrapeSelector {
        selector: "video source",
        property: "src",
    },
    ScrapeSelector {
        selector: "video",
        property: "src",
    },
    ScrapeSelector {
        selector: "source[type*=\"video\"]",
        property: "src",
    },
    ScrapeSelector {
        selector: "[data-video-url]",
        property: "data-video-url",
    },
    ScrapeSelector {
        selector: "meta[property=\"og:video\"]",
        property: "content",
    },
    ScrapeSelector {
        selector: "meta[property=\"og:video:url\"]",
        property: "content",
    },
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeReport {
    #[serde(default)]
    pub data: Vec<ScrapeElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeElement {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub results: Vec<ScrapeValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeValue {
    #[serde(default)]
    pub text: Option<String>,
}

impl ScrapeReport {
    /// All scraped text values, in selector order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.data
            .iter()
            .flat_map(|element| element.results.iter())
            .filter_map(|value| value.text.as_deref())
    }
}

#[async_trait]
pub trait HeadlessBrowser: Send + Sync {
    async fn scrape(&self, url: &str, selectors: &[ScrapeSelector]) -> FallbackResult<ScrapeReport>;
    async fn screenshot(&self, url: &str) -> FallbackResult<Vec<u8>>;
    async fn content(&self, url: &str) -> FallbackResult<String>;
}

pub struct BrowserlessClient {
    base_url: String,
    token: String,
    wait_for_ms: u64,
    navigation_timeout_ms: u64,
    http: reqwest::Client,
}

impl BrowserlessClient {
    pub fn new(section: &BrowserlessSection) -> Self {
        let navigation_timeout_ms = if section.navigation_timeout_ms > 0 {
            section.navigation_timeout_ms
        } else {
            NAVIGATION_TIMEOUT_MS
        };
        Self {
            base_url: section.base_url.trim_end_matches('/').to_string(),
            token: section.api_key.clone(),
            wait_for_ms: section.wait_for_ms,
            navigation_timeout_ms,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}?token={}", self.base_url, action, self.token)
    }

    fn goto_options(&self) -> serde_json::Value {
        json!({ "waitUntil": "networkidle2", "timeout": self.navigation_timeout_ms })
    }

    async fn send(
        &self,
        action: &str,
        body: &serde_json::Value,
    ) -> FallbackResult<reqwest::Response> {
        debug!(action, "calling browser service");
        let response = self
            .http
            .post(self.endpoint(action))
            .timeout(Duration::from_millis(self.navigation_timeout_ms))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = snippet(&response.text().await.unwrap_or_default());
            return Err(FallbackError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HeadlessBrowser for BrowserlessClient {
    async fn scrape(&self, url: &str, selectors: &[ScrapeSelector]) -> FallbackResult<ScrapeReport> {
        let body = json!({
            "url": url,
            "elements": selectors,
            "waitFor": self.wait_for_ms,
            "gotoOptions": self.goto_options(),
        });
        let report = self.send("scrape", &body).await?.json().await?;
        Ok(report)
    }

    async fn screenshot(&self, url: &str) -> FallbackResult<Vec<u8>> {
        let body = json!({
            "url": url,
            "options": { "type": "png", "fullPage": false },
            "gotoOptions": self.goto_options(),
        });
        let bytes = self.send("screenshot", &body).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn content(&self, url: &str) -> FallbackResult<String> {
        let body = json!({
            "url": url,
            "gotoOptions": self.goto_options(),
        });
        let html = self.send("content", &body).await?.text().await?;
        Ok(html)
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
