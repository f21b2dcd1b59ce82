//! Best-effort rewriting of content URLs into embeddable player URLs.
//!
//! Resolution fails open: anything unparseable or unrecognized comes back
//! unchanged, because downstream consumers always need *some* URL to try.

use std::fmt;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPlatform {
    YouTube,
    Vimeo,
    Dailymotion,
}

impl EmbedPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedPlatform::YouTube => "youtube",
            EmbedPlatform::Vimeo => "vimeo",
            EmbedPlatform::Dailymotion => "dailymotion",
        }
    }
}

impl fmt::Display for EmbedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies which known-embeddable platform hosts `raw`, if any.
pub fn classify(raw: &str) -> Option<EmbedPlatform> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    if host.contains("youtube.com") || host.contains("youtu.be") {
        Some(EmbedPlatform::YouTube)
    } else if host.contains("vimeo.com") {
        Some(EmbedPlatform::Vimeo)
    } else if host.contains("dailymotion.com") {
        Some(EmbedPlatform::Dailymotion)
    } else {
        None
    }
}

pub fn is_known_embeddable(raw: &str) -> bool {
    classify(raw).is_some()
}

/// Rewrites `raw` to the platform's canonical embeddable player URL, or
/// returns it unchanged when no rewrite applies.
pub fn resolve_embed_url(raw: &str) -> String {
    try_resolve(raw).unwrap_or_else(|| raw.to_string())
}

fn try_resolve(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?;

    if host.contains("youtu.be") {
        let id = parsed.path().trim_start_matches('/');
        if id.is_empty() {
            return None;
        }
        return Some(format!("https://www.youtube.com/embed/{id}?autoplay=1&rel=0"));
    }

    if host.contains("youtube.com") {
        let id = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?;
        if id.is_empty() {
            return None;
        }
        return Some(format!("https://www.youtube.com/embed/{id}?autoplay=1&rel=0"));
    }

    if host.contains("vimeo.com") {
        let id = last_segment(&parsed)?;
        return Some(format!("https://player.vimeo.com/video/{id}?autoplay=1"));
    }

    if host.contains("dailymotion.com") {
        let id = last_segment(&parsed)?;
        return Some(format!(
            "https://www.dailymotion.com/embed/video/{id}?autoplay=1"
        ));
    }

    None
}

fn last_segment(parsed: &Url) -> Option<String> {
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}
