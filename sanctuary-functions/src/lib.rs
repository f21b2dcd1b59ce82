//! HTTP surface for the fallback acquisition service.
//!
//! A single JSON endpoint mirroring the hosted serverless function
//! contract: `POST /fallback-downloader`. CORS is permissive because the
//! web client calls this directly from the browser.

use std::sync::Arc;

use axum::http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use sanctuary_core::{FallbackOutcome, FallbackRequest, FallbackService};

pub struct AppState {
    /// `None` when the required browser-service credential was absent at
    /// startup; requests then receive an explicit error outcome instead of
    /// silently degrading.
    pub service: Option<Arc<FallbackService>>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/fallback-downloader", post(fallback_downloader))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(Extension(state)),
        )
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

#[derive(Debug, Deserialize)]
pub struct FallbackDownloadBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub remaining_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FallbackDownloadResponse {
    pub can_watch: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl FallbackDownloadResponse {
    fn missing_params() -> Self {
        Self {
            can_watch: false,
            kind: None,
            reply: "Missing required parameters. Let's try again.".to_string(),
            play_url: None,
            screenshot_url: None,
            remaining_minutes: None,
            expires_in: None,
        }
    }
}

impl From<FallbackOutcome> for FallbackDownloadResponse {
    fn from(outcome: FallbackOutcome) -> Self {
        match outcome {
            FallbackOutcome::Downloaded {
                play_url,
                expires_in,
                remaining_minutes,
                reply,
            } => Self {
                can_watch: true,
                kind: Some("downloaded"),
                reply,
                play_url: Some(play_url),
                screenshot_url: None,
                remaining_minutes: Some(remaining_minutes),
                expires_in: Some(expires_in),
            },
            FallbackOutcome::ScreenshotOnly {
                screenshot_url,
                remaining_minutes,
                reply,
            } => Self {
                can_watch: false,
                kind: Some("screenshot_only"),
                reply,
                play_url: None,
                screenshot_url: Some(screenshot_url),
                remaining_minutes: Some(remaining_minutes),
                expires_in: None,
            },
            FallbackOutcome::Unavailable {
                remaining_minutes,
                reply,
            } => Self {
                can_watch: false,
                kind: Some("unavailable"),
                reply,
                play_url: None,
                screenshot_url: None,
                remaining_minutes: Some(remaining_minutes),
                expires_in: None,
            },
            FallbackOutcome::Error { reply } => Self {
                can_watch: false,
                kind: Some("error"),
                reply,
                play_url: None,
                screenshot_url: None,
                remaining_minutes: None,
                expires_in: None,
            },
        }
    }
}

async fn fallback_downloader(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<FallbackDownloadBody>,
) -> Json<FallbackDownloadResponse> {
    let (Some(url), Some(user_id)) = (body.url, body.user_id) else {
        return Json(FallbackDownloadResponse::missing_params());
    };

    let Some(service) = state.service.as_ref() else {
        warn!("fallback requested while service is unconfigured");
        return Json(FallbackOutcome::not_configured().into());
    };

    let request = FallbackRequest {
        url,
        user_id,
        remaining_seconds: body.remaining_seconds,
    };
    let outcome = service.acquire(&request).await;
    Json(outcome.into())
}
