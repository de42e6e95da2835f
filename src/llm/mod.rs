/// Generative-text insights via the Gemini API.
///
/// Each workflow can ask for a narrative on its latest result: an operator
/// action plan for an energy forecast, diagnostic steps for a predicted
/// fault, or an analysis of a timestamp-search cluster.
///
/// Internally failures are [`InsightError`]s. [`generate_text`] is the view
/// boundary: it always returns a string, replacing a failure with a
/// sentinel that starts with `"Error: "` so the dashboard can show it where
/// the insight would have been.
///
/// # Configuration
///
/// - `[insights] enabled` (default `true`), `GRIDSIGHT_INSIGHTS=0` disables
/// - `[insights] api_key` or `GRIDSIGHT_GEMINI_API_KEY`
/// - `[insights] model`, `endpoint`, `timeout_ms`
use std::time::Instant;

pub mod gemini;
pub mod prompts;

pub use gemini::{GeminiClient, InsightError};
pub use prompts::InsightKind;

use crate::analytics::events;
use crate::config::schema::InsightsConfig;

/// Sentinel prefix shared by every failure string.
pub const ERROR_PREFIX: &str = "Error: ";

/// Send `prompt` and return the generated text or a sentinel error string.
pub fn generate_text(config: &InsightsConfig, prompt: &str) -> String {
    let client = GeminiClient::from_config(config);
    let start = Instant::now();
    let result = client.generate(prompt);
    let latency_ms = start.elapsed().as_millis() as u64;

    let detail = result.as_ref().err().map(ToString::to_string);
    events::log_request("insights", client.model_name(), result.is_ok(), latency_ms, detail.as_deref());

    to_display(result)
}

/// Collapse an insight result into the string shown to the user.
pub fn to_display(result: Result<String, InsightError>) -> String {
    match result {
        Ok(text) => text,
        Err(InsightError::Unparsable) => {
            format!("{ERROR_PREFIX}Could not parse Gemini's response.")
        }
        Err(err) => format!("{ERROR_PREFIX}Could not retrieve insights. {err}"),
    }
}

/// Whether a displayed insight is a failure sentinel.
pub fn is_error(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_text_passes_through() {
        assert_eq!(to_display(Ok("1. Isolate the line".to_string())), "1. Isolate the line");
        assert!(!is_error("1. Isolate the line"));
    }

    #[test]
    fn unparsable_response_sentinel() {
        let text = to_display(Err(InsightError::Unparsable));
        assert_eq!(text, "Error: Could not parse Gemini's response.");
        assert!(is_error(&text));
    }

    #[test]
    fn request_failure_sentinel_carries_reason() {
        let text = to_display(Err(InsightError::Request(
            "API call failed with status: 403".to_string(),
        )));
        assert_eq!(
            text,
            "Error: Could not retrieve insights. API call failed with status: 403"
        );
    }

    #[test]
    fn generate_text_without_key_returns_sentinel() {
        let config = InsightsConfig::default();
        let text = generate_text(&config, "anything");
        assert_eq!(
            text,
            "Error: Could not retrieve insights. no Gemini API key configured"
        );
    }
}
