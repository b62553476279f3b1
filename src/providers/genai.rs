use crate::errors::ProviderError;
use crate::providers::{http_client, status_error, truncate_body};
use serde::{Deserialize, Serialize};
use serde_json::json;

const PROVIDER: &str = "generative ai";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            text: text.into(),
        }
    }
}

pub trait GenAiProvider: Send + Sync {
    /// Sends a multi-turn request and returns the generated text.
    fn generate(&self, turns: &[ChatTurn]) -> Result<String, ProviderError>;
}

/// Generative-AI completion endpoint, API key as query param, request shape
/// `{contents: [{role, parts: [{text}]}]}`.
pub struct HttpGenAiProvider {
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpGenAiProvider {
    pub fn new(base_url: String, model: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url,
            model,
            api_key,
            timeout_secs,
        }
    }
}

/// The generated text lives at `candidates[0].content.parts[0].text`. A 2xx
/// response without a non-empty value there is an error that carries the raw
/// body for diagnosis, never a defaulted empty string.
pub(crate) fn parse_generate_response(body: &str) -> Result<String, ProviderError> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("invalid json ({err}): {}", truncate_body(body)),
        })?;

    let text = parsed
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.trim().is_empty());

    match text {
        Some(text) => Ok(text.to_string()),
        None => Err(ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("no generated text in response: {}", truncate_body(body)),
        }),
    }
}

impl GenAiProvider for HttpGenAiProvider {
    fn generate(&self, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let contents: Vec<serde_json::Value> = turns
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role,
                    "parts": [{"text": turn.text}],
                })
            })
            .collect();

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({ "contents": contents }))
            .send()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response));
        }

        let body = response
            .text()
            .map_err(|err| ProviderError::from_reqwest(PROVIDER, self.timeout_secs, err))?;

        parse_generate_response(&body)
    }
}
