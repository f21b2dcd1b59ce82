use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embed;

/// One content descriptor returned by the search collaborator and fed into
/// the embed/viewer pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_label: Option<String>,
}

impl SearchResult {
    pub fn is_embeddable(&self) -> bool {
        embed::is_known_embeddable(&self.url)
    }

    /// Best-effort player URL; falls back to the original URL.
    pub fn embed_url(&self) -> String {
        embed::resolve_embed_url(&self.url)
    }
}

/// A search result the user kept for later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: String,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub result: SearchResult,
}
