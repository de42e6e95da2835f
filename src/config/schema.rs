/// Configuration schema and defaults for gridsight.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[backend]`, `[insights]`, `[storage]`, `[logging]`, and `[web]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level gridsight configuration.
///
/// Maps directly to the `~/.gridsight/config.toml` and `.gridsight.toml`
/// file schemas. All sections and fields are optional; missing values fall
/// back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridsightConfig {
    pub backend: BackendConfig,
    pub insights: InsightsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Prediction backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the prediction API.
    pub url: String,
    /// Fixed client-side timeout per request (milliseconds).
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [insights]
// ---------------------------------------------------------------------------

/// Generative-text insight settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Whether insight generation is offered at all.
    pub enabled: bool,
    /// API credential. Usually supplied via `GRIDSIGHT_GEMINI_API_KEY`.
    pub api_key: String,
    /// Model name inserted into the endpoint path.
    pub model: String,
    /// Base endpoint, without the `/models/...` suffix.
    pub endpoint: String,
    /// Request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [storage]
// ---------------------------------------------------------------------------

/// Durable key-value store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per key. `~` expands to home.
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "~/.gridsight/store".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether event logging is enabled.
    pub enabled: bool,
    /// Path to the event log file. `~` is expanded to the home directory.
    pub path: String,
    /// Log level: `"debug"`, `"info"`, `"warn"`, `"error"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.gridsight/events.jsonl".to_string(),
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Dashboard server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `gridsight web`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

impl GridsightConfig {
    /// Annotated default config written by `gridsight config init`.
    pub fn default_toml() -> String {
        r#"# gridsight configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (GRIDSIGHT_*)
#   2. Project config (.gridsight.toml in current directory)
#   3. User global config (~/.gridsight/config.toml)
#   4. Built-in defaults

[backend]
url = "http://127.0.0.1:8000"
timeout_ms = 10000

[insights]
enabled = true
api_key = ""                          # Prefer GRIDSIGHT_GEMINI_API_KEY
model = "gemini-2.0-flash"
endpoint = "https://generativelanguage.googleapis.com/v1beta"
timeout_ms = 30000

[storage]
dir = "~/.gridsight/store"

[logging]
enabled = true
path = "~/.gridsight/events.jsonl"
level = "info"                        # debug | info | warn | error

[web]
addr = "127.0.0.1:9747"
open_browser = true
"#
        .to_string()
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    std::path::PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = GridsightConfig::default();
        assert_eq!(config.backend.url, "http://127.0.0.1:8000");
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert!(config.insights.enabled);
        assert!(config.insights.api_key.is_empty());
        assert_eq!(config.insights.model, "gemini-2.0-flash");
        assert!(config.logging.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[backend]
url = "http://grid:9000"
"#;
        let config: GridsightConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.url, "http://grid:9000");
        // Everything else falls back to defaults
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.web.addr, "127.0.0.1:9747");
    }

    #[test]
    fn default_toml_matches_defaults() {
        let parsed: GridsightConfig = toml::from_str(&GridsightConfig::default_toml()).unwrap();
        let defaults = GridsightConfig::default();
        assert_eq!(parsed.backend.url, defaults.backend.url);
        assert_eq!(parsed.insights.timeout_ms, defaults.insights.timeout_ms);
        assert_eq!(parsed.storage.dir, defaults.storage.dir);
        assert_eq!(parsed.logging.path, defaults.logging.path);
        assert_eq!(parsed.web.open_browser, defaults.web.open_browser);
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/lib/gridsight"),
            std::path::PathBuf::from("/var/lib/gridsight")
        );
    }
}
