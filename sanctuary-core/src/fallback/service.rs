//! Fallback acquisition: quota re-check, scrape, download, screenshot.
//!
//! Invoked when a content URL refused to embed. Each step's failure falls
//! through to the next; the first terminal state wins and exactly one
//! outcome is returned per invocation. Upstream failures are logged and
//! absorbed here, never surfaced to the caller as hard errors.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SanctuaryConfig;
use crate::error::Result as ConfigResult;
use crate::ledger::ProfileStore;
use crate::quota;

use super::browserless::{BrowserlessClient, HeadlessBrowser, MEDIA_SELECTORS};
use super::error::{FallbackError, FallbackResult};
use super::fetch::{HttpMediaFetcher, MediaFetcher};
use super::storage::{BucketClient, ObjectStore};

/// Signed URLs never expire in under five minutes, even when the user has
/// less time than that left; a shorter link would be unusable.
pub const MIN_SIGNED_URL_SECONDS: i64 = 300;
/// Downloads at or under this size are likely error pages, not media.
pub const MIN_MEDIA_BYTES: usize = 1000;

const MISSING_PROFILE_REPLY: &str = "Couldn't find your profile. Please try logging in again.";
const ALLOWANCE_USED_REPLY: &str =
    "You've completed today's allowance. Great progress! Fresh start tomorrow.";
const SCREENSHOT_REPLY: &str =
    "This site restricts video downloads. I captured a preview for you. Try a different source for full video.";
pub(crate) const NOT_CONFIGURED_REPLY: &str =
    "Fallback system not configured. Please contact support.";

fn downloaded_reply(remaining_minutes: i64) -> String {
    format!(
        "Site blocked live view, so I downloaded it for you. Enjoy your remaining {remaining_minutes} minutes."
    )
}

fn unavailable_reply(remaining_minutes: i64) -> String {
    format!(
        "This site has strong protections. No worries - try another source. You still have {remaining_minutes} minutes today."
    )
}

/// Minutes shown to the user; rounded up so a few remaining seconds never
/// read as "0 minutes" on a successful outcome.
fn display_minutes(remaining_seconds: i64) -> i64 {
    (remaining_seconds + 59) / 60
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRequest {
    pub url: String,
    pub user_id: String,
    /// Client-reported remaining time. Informational only; the service
    /// recomputes remaining time from the profile and never trusts this.
    #[serde(default)]
    pub remaining_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    Downloaded {
        play_url: String,
        expires_in: i64,
        remaining_minutes: i64,
        reply: String,
    },
    ScreenshotOnly {
        screenshot_url: String,
        remaining_minutes: i64,
        reply: String,
    },
    Unavailable {
        remaining_minutes: i64,
        reply: String,
    },
    /// Required configuration absent. Distinct from content
    /// unavailability so the caller can route it to support.
    Error { reply: String },
}

impl FallbackOutcome {
    pub fn not_configured() -> Self {
        FallbackOutcome::Error {
            reply: NOT_CONFIGURED_REPLY.to_string(),
        }
    }

    pub fn can_watch(&self) -> bool {
        matches!(self, FallbackOutcome::Downloaded { .. })
    }

    pub fn reply(&self) -> &str {
        match self {
            FallbackOutcome::Downloaded { reply, .. }
            | FallbackOutcome::ScreenshotOnly { reply, .. }
            | FallbackOutcome::Unavailable { reply, .. }
            | FallbackOutcome::Error { reply } => reply,
        }
    }
}

pub struct FallbackService {
    browser: Arc<dyn HeadlessBrowser>,
    storage: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn MediaFetcher>,
    profiles: Arc<dyn ProfileStore>,
    media_pattern: Regex,
    html_media_pattern: Regex,
}

impl FallbackService {
    pub fn new(
        browser: Arc<dyn HeadlessBrowser>,
        storage: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn MediaFetcher>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let media_pattern =
            Regex::new(r"(?i)\.(mp4|webm|m3u8|mov|mkv)(\?|$)").expect("valid regex");
        let html_media_pattern =
            Regex::new(r#"(?i)https?://[^"'\s<>]+\.(mp4|webm|m3u8|mov|mkv)[^"'\s<>]*"#)
                .expect("valid regex");
        Self {
            browser,
            storage,
            fetcher,
            profiles,
            media_pattern,
            html_media_pattern,
        }
    }

    /// Wires the production clients from validated configuration.
    pub fn from_config(
        config: &SanctuaryConfig,
        profiles: Arc<dyn ProfileStore>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let browser = BrowserlessClient::new(&config.browserless);
        let storage = BucketClient::new(&config.storage);
        let fetcher = HttpMediaFetcher::new(Duration::from_millis(
            config.browserless.navigation_timeout_ms,
        ));
        Ok(Self::new(
            Arc::new(browser),
            Arc::new(storage),
            Arc::new(fetcher),
            profiles,
        ))
    }

    /// Runs the acquisition ladder to exactly one terminal outcome. The
    /// quota re-check is server-authoritative; a client-claimed remaining
    /// time is never consulted for gating.
    pub async fn acquire(&self, request: &FallbackRequest) -> FallbackOutcome {
        let profile = match self.profiles.load_profile(&request.user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(user_id = %request.user_id, "fallback requested for unknown profile");
                return FallbackOutcome::Unavailable {
                    remaining_minutes: 0,
                    reply: MISSING_PROFILE_REPLY.to_string(),
                };
            }
            Err(error) => {
                warn!(user_id = %request.user_id, %error, "profile lookup failed");
                return FallbackOutcome::Unavailable {
                    remaining_minutes: 0,
                    reply: MISSING_PROFILE_REPLY.to_string(),
                };
            }
        };

        let remaining_seconds =
            quota::remaining_seconds(profile.current_day, profile.total_watch_time_today);
        if remaining_seconds <= 0 {
            info!(user_id = %request.user_id, "daily allowance exhausted; skipping acquisition");
            return FallbackOutcome::Unavailable {
                remaining_minutes: 0,
                reply: ALLOWANCE_USED_REPLY.to_string(),
            };
        }
        let remaining_minutes = display_minutes(remaining_seconds);
        info!(
            url = %request.url,
            user_id = %request.user_id,
            remaining_minutes,
            "fallback acquisition requested"
        );

        match self
            .try_download(&request.url, &request.user_id, remaining_seconds)
            .await
        {
            Ok(outcome) => return outcome,
            Err(error) => {
                warn!(url = %request.url, %error, "download path failed; trying screenshot")
            }
        }

        match self
            .try_screenshot(&request.url, &request.user_id, remaining_seconds)
            .await
        {
            Ok(outcome) => return outcome,
            Err(error) => warn!(url = %request.url, %error, "screenshot fallback failed"),
        }

        FallbackOutcome::Unavailable {
            remaining_minutes,
            reply: unavailable_reply(remaining_minutes),
        }
    }

    /// True when a scraped value plausibly points at media.
    fn is_media_candidate(&self, text: &str) -> bool {
        self.media_pattern.is_match(text) || text.contains("video")
    }

    async fn find_candidate(&self, url: &str) -> FallbackResult<String> {
        let report = self.browser.scrape(url, MEDIA_SELECTORS).await?;
        if let Some(candidate) = report.texts().find(|text| self.is_media_candidate(text)) {
            return Ok(candidate.to_string());
        }

        // Players that attach sources at runtime slip past the selector
        // list; the rendered page HTML is the last place a direct link can
        // still surface.
        let html = self.browser.content(url).await?;
        self.html_media_pattern
            .find(&html)
            .map(|found| found.as_str().to_string())
            .ok_or(FallbackError::NoCandidate)
    }

    async fn try_download(
        &self,
        url: &str,
        user_id: &str,
        remaining_seconds: i64,
    ) -> FallbackResult<FallbackOutcome> {
        let candidate = self.find_candidate(url).await?;
        info!(candidate = %candidate, "found direct media url");

        let bytes = self.fetcher.fetch(&candidate).await?;
        if bytes.len() <= MIN_MEDIA_BYTES {
            return Err(FallbackError::PayloadTooSmall(bytes.len()));
        }

        let key = format!("{user_id}/{}.mp4", Uuid::new_v4());
        self.storage.upload(&key, bytes, "video/mp4").await?;

        let expires_in = remaining_seconds.max(MIN_SIGNED_URL_SECONDS);
        let play_url = self.storage.signed_url(&key, expires_in as u64).await?;
        let remaining_minutes = display_minutes(remaining_seconds);
        info!(key = %key, expires_in, "media downloaded and stored");
        Ok(FallbackOutcome::Downloaded {
            play_url,
            expires_in,
            remaining_minutes,
            reply: downloaded_reply(remaining_minutes),
        })
    }

    async fn try_screenshot(
        &self,
        url: &str,
        user_id: &str,
        remaining_seconds: i64,
    ) -> FallbackResult<FallbackOutcome> {
        let png = self.browser.screenshot(url).await?;
        let key = format!("{user_id}/screenshots/{}.png", Uuid::new_v4());
        self.storage.upload(&key, png, "image/png").await?;

        let screenshot_url = self
            .storage
            .signed_url(&key, remaining_seconds.max(0) as u64)
            .await?;
        let remaining_minutes = display_minutes(remaining_seconds);
        info!(key = %key, "stored screenshot preview");
        Ok(FallbackOutcome::ScreenshotOnly {
            screenshot_url,
            remaining_minutes,
            reply: SCREENSHOT_REPLY.to_string(),
        })
    }
}
