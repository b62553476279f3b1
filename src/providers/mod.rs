pub mod captions;
pub mod genai;
pub mod metadata;
pub mod playlist;

pub use captions::CaptionProvider;
pub use genai::{ChatTurn, GenAiProvider};
pub use metadata::{VideoMetadata, VideoMetadataProvider};
pub use playlist::PlaylistProvider;

use crate::errors::ProviderError;
use std::time::Duration;

/// Cap on provider response bodies embedded in error messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Blocking client with an explicit per-request timeout. Every provider call
/// goes through one of these so a hung provider surfaces as a timeout error
/// instead of stalling the job forever.
pub fn http_client(timeout_secs: u64) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build http client")
}

/// Truncates a response body for embedding in error messages.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut out: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push_str("...");
    out
}

/// Reads a non-2xx response into a diagnosable Status error.
pub fn status_error(
    provider: &'static str,
    response: reqwest::blocking::Response,
) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    ProviderError::Status {
        provider,
        status,
        body: truncate_body(&body),
    }
}
