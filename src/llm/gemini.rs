/// Gemini `generateContent` client for narrative insights.
///
/// One blocking request per prompt, no streaming, no retry. The API key is
/// sent as the `key` query parameter. Failures are typed as [`InsightError`]
/// so callers can tell an unreachable service from an answer with no text.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientError;
use crate::config::schema::InsightsConfig;

// ---------------------------------------------------------------------------
// Request / response types for the Gemini API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response body from `generateContent`. Every level is optional; a missing
/// level means the answer carried no text.
#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an insight could not be produced.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("insights are disabled")]
    Disabled,

    #[error("no Gemini API key configured")]
    MissingApiKey,

    /// Transport failure or non-2xx status.
    #[error("{0}")]
    Request(String),

    /// A 2xx answer without `candidates[0].content.parts[0].text`.
    #[error("response carried no candidate text")]
    Unparsable,
}

impl From<ureq::Error> for InsightError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => {
                Self::Request(format!("API call failed with status: {status}"))
            }
            other => Self::Request(ClientError::from(other).to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous Gemini HTTP client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    enabled: bool,
    timeout: Duration,
}

impl GeminiClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &InsightsConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            enabled: config.enabled,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Return the model name for logging.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user turn and return the first candidate's
    /// text.
    pub fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        if !self.enabled {
            return Err(InsightError::Disabled);
        }
        if self.api_key.trim().is_empty() {
            return Err(InsightError::MissingApiKey);
        }

        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };

        let resp = ureq::post(&self.url())
            .timeout(self.timeout)
            .query("key", &self.api_key)
            .send_json(&body)?;

        // A body that is not JSON at all is as unusable as one with no text.
        let parsed: GenerateResponse = resp.into_json().unwrap_or_default();
        parsed.first_text().ok_or(InsightError::Unparsable)
    }

    fn url(&self) -> String {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        url.replace("://localhost", "://127.0.0.1")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
