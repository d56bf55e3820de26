//! services/api/src/adapters/gemini.rs
//!
//! A thin client for the Gemini `generateContent` REST endpoint, shared by
//! the text and image adapters.

use std::time::Duration;

use lesson_core::ports::{PortError, PortResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Calls `{base_url}/models/{model}:generateContent` with an API key.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(300)).build()?;
        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts a request body for `model`.
    ///
    /// HTTP 429 and `RESOURCE_EXHAUSTED` bodies map to `QuotaExceeded`; every
    /// other failure, including an unreadable body, to `GenerationFailed`.
    pub async fn generate_content(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> PortResult<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, "Calling Gemini generateContent");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::GenerationFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || text.contains("RESOURCE_EXHAUSTED") {
                return Err(PortError::QuotaExceeded);
            }
            return Err(PortError::GenerationFailed(format!(
                "Gemini returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        resp.json::<GenerateContentResponse>()
            .await
            .map_err(|e| PortError::GenerationFailed(format!("Unreadable Gemini response: {}", e)))
    }
}

//=========================================================================================
// Response Shape
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// All text parts of the first candidate, concatenated.
    pub fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// The first inline payload of the first candidate.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}
