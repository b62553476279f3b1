use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Broad acceptance pattern. Anything failing this is rejected before the
/// pipeline is ever invoked; precise id extraction happens in classify().
static YOUTUBE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+")
        .expect("failed to compile youtube url regex")
});

/// Canonical video ids are exactly 11 characters.
const VIDEO_ID_LEN: usize = 11;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Video,
    Shorts,
    Playlist,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Shorts => "shorts",
            ContentKind::Playlist => "playlist",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Classification {
    pub video_id: Option<String>,
    pub playlist_id: Option<String>,
    pub kind: ContentKind,
}

pub fn validate_youtube_url(url: &str) -> bool {
    YOUTUBE_URL_REGEX.is_match(url.trim())
}

/// Classifies a submitted URL. Playlist detection is a deliberate token
/// check, not full URL grammar: presence of `list=` alone decides.
pub fn classify(url: &str) -> Classification {
    let url = url.trim();

    if url.contains("list=") {
        return Classification {
            video_id: extract_video_id(url),
            playlist_id: extract_query_param(url, "list"),
            kind: ContentKind::Playlist,
        };
    }

    if url.contains("/shorts/") {
        return Classification {
            video_id: extract_shorts_id(url),
            playlist_id: None,
            kind: ContentKind::Shorts,
        };
    }

    Classification {
        video_id: extract_video_id(url),
        playlist_id: None,
        kind: ContentKind::Video,
    }
}

/// Extracts a video id from `v=` or the `youtu.be/<id>` short form.
/// Anything that is not exactly 11 characters counts as "no id found".
fn extract_video_id(url: &str) -> Option<String> {
    let id = extract_query_param(url, "v").or_else(|| {
        url.split("youtu.be/")
            .nth(1)
            .map(|rest| rest.split(['?', '&', '/']).next().unwrap_or(rest).to_string())
    })?;

    (id.len() == VIDEO_ID_LEN).then_some(id)
}

/// The shorts id is the path segment immediately following `/shorts/`.
fn extract_shorts_id(url: &str) -> Option<String> {
    let id = url
        .split("/shorts/")
        .nth(1)
        .map(|rest| rest.split(['?', '&', '/']).next().unwrap_or(rest).to_string())?;

    (id.len() == VIDEO_ID_LEN).then_some(id)
}

fn extract_query_param(url: &str, name: &str) -> Option<String> {
    // url::Url requires a scheme; submissions frequently omit it
    let normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };

    let parsed = url::Url::parse(&normalized).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
