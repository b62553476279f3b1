use crate::errors::ProviderError;
use crate::providers::{http_client, status_error, truncate_body};
use serde::Deserialize;

const PROVIDER: &str = "video metadata";

#[derive(Clone, Debug, Default)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub duration: Option<String>,
}

pub trait VideoMetadataProvider: Send + Sync {
    fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    #[serde(rename = "contentDetails", default)]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: Option<String>,
}

/// Video-platform data API, GET by id + API key.
pub struct HttpVideoMetadataProvider {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpVideoMetadataProvider {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url,
            api_key,
            timeout_secs,
        }
    }
}

/// Zero result items means "video not found", not an empty success.
pub(crate) fn parse_videos_response(body: &str) -> Result<VideoMetadata, ProviderError> {
    let parsed: VideosResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("invalid json ({err}): {}", truncate_body(body)),
        })?;

    let item = parsed
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER,
            detail: "video not found".to_string(),
        })?;

    Ok(VideoMetadata {
        title: item.snippet.title,
        description: item.snippet.description,
        duration: item.content_details.and_then(|cd| cd.duration),
    })
}

impl VideoMetadataProvider for HttpVideoMetadataProvider {
    fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", video_id),
                ("key", &self.api_key),
            ])
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response));
        }

        let body = response
            .text()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        parse_videos_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_item() {
        let body = r#"{"items": [{"snippet": {"title": "A title", "description": "A description"}, "contentDetails": {"duration": "PT4M13S"}}]}"#;
        let meta = parse_videos_response(body).unwrap();
        assert_eq!(meta.title, "A title");
        assert_eq!(meta.description, "A description");
        assert_eq!(meta.duration.as_deref(), Some("PT4M13S"));
    }

    #[test]
    fn zero_items_is_not_found() {
        let body = r#"{"items": []}"#;
        let err = parse_videos_response(body).unwrap_err();
        assert!(err.to_string().contains("video not found"));
    }
}
