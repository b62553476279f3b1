use crate::errors::ProviderError;
use crate::providers::{http_client, status_error, truncate_body};
use serde::Deserialize;

const PROVIDER: &str = "captions";

pub trait CaptionProvider: Send + Sync {
    /// Fetches the plain-text transcript for a single video id.
    fn fetch_transcript(&self, video_id: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    lang: Option<String>,
}

/// External captioning service, API-key header auth, `{url, text=true}`
/// request shape.
pub struct HttpCaptionProvider {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpCaptionProvider {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url,
            api_key,
            timeout_secs,
        }
    }

    fn request(&self, video_url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .header("x-api-key", &self.api_key)
            .query(&[("url", video_url), ("text", "true")])
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response));
        }

        let body = response
            .text()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        parse_transcript_response(&body)
    }
}

/// A 2xx response with a missing or empty `content` field is an error, never
/// an empty-string success.
pub(crate) fn parse_transcript_response(body: &str) -> Result<String, ProviderError> {
    let parsed: TranscriptResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("invalid json ({err}): {}", truncate_body(body)),
        })?;

    match parsed.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("missing transcript content: {}", truncate_body(body)),
        }),
    }
}

/// Some videos only resolve under the shorts URL shape. Retry once for
/// client-error responses; anything else (server errors, timeouts) is
/// surfaced as-is, and a second failure surfaces the second error.
fn fetch_with_shorts_retry(
    video_id: &str,
    request: impl Fn(&str) -> Result<String, ProviderError>,
) -> Result<String, ProviderError> {
    let watch_url = format!("https://www.youtube.com/watch?v={video_id}");

    match request(&watch_url) {
        Ok(content) => Ok(content),
        Err(ProviderError::Status { status, .. }) if status == 400 || status == 404 => {
            log::debug!("captions lookup for {video_id} got {status}, retrying as shorts");
            let shorts_url = format!("https://www.youtube.com/shorts/{video_id}");
            request(&shorts_url)
        }
        Err(err) => Err(err),
    }
}

impl CaptionProvider for HttpCaptionProvider {
    fn fetch_transcript(&self, video_id: &str) -> Result<String, ProviderError> {
        fetch_with_shorts_retry(video_id, |url| self.request(url))
    }
}
