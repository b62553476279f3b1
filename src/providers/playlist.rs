use crate::errors::ProviderError;
use crate::providers::{http_client, status_error, truncate_body};
use serde::Deserialize;

const PROVIDER: &str = "playlist membership";

pub trait PlaylistProvider: Send + Sync {
    /// Fetches the member video ids of a playlist, in playlist order.
    fn fetch_video_ids(&self, playlist_id: &str) -> Result<Vec<String>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    #[serde(rename = "videoIds", default)]
    video_ids: Vec<String>,
    #[serde(rename = "shortIds", default)]
    short_ids: Vec<String>,
    #[serde(rename = "liveIds", default)]
    live_ids: Vec<String>,
}

pub struct HttpPlaylistProvider {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpPlaylistProvider {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url,
            api_key,
            timeout_secs,
        }
    }
}

/// Merges the regular/shorts/live sub-lists, de-duplicated preserving first
/// occurrence. An empty merged list is for the caller to reject.
pub(crate) fn parse_playlist_response(body: &str) -> Result<Vec<String>, ProviderError> {
    let parsed: PlaylistResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("invalid json ({err}): {}", truncate_body(body)),
        })?;

    let mut merged = Vec::new();
    for id in parsed
        .video_ids
        .into_iter()
        .chain(parsed.short_ids)
        .chain(parsed.live_ids)
    {
        if !merged.contains(&id) {
            merged.push(id);
        }
    }

    Ok(merged)
}

impl PlaylistProvider for HttpPlaylistProvider {
    fn fetch_video_ids(&self, playlist_id: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .header("x-api-key", &self.api_key)
            .query(&[("id", playlist_id)])
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response));
        }

        let body = response
            .text()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        parse_playlist_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_sublists_in_order() {
        let body = r#"{"videoIds": ["a", "b"], "shortIds": ["c"], "liveIds": ["d"]}"#;
        assert_eq!(parse_playlist_response(body).unwrap(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn deduplicates_preserving_first_occurrence() {
        let body = r#"{"videoIds": ["a", "b"], "shortIds": ["b", "c"], "liveIds": ["a"]}"#;
        assert_eq!(parse_playlist_response(body).unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn missing_sublists_default_to_empty() {
        let body = r#"{"videoIds": ["a"]}"#;
        assert_eq!(parse_playlist_response(body).unwrap(), ["a"]);
    }
}
