//! Structured event log: one JSON line per notable event.
//!
//! Records prediction requests, discarded stale responses, store failures
//! and insight calls so a session can be reconstructed afterwards.
//!
//! Log file: `~/.gridsight/events.jsonl` (see `[logging]` in the config).
//! Logging stays off until [`init`] is called; the binary does this at
//! startup, library consumers and tests opt in explicitly.

use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Utc;
use serde::Serialize;

use crate::config::schema::{LoggingConfig, expand_home};

// ---------------------------------------------------------------------------
// Levels and settings
// ---------------------------------------------------------------------------

/// Severity of an event. Ordered so that `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
struct LogSettings {
    path: PathBuf,
    min_level: Level,
}

static SETTINGS: OnceLock<Option<LogSettings>> = OnceLock::new();

/// Enable event logging from the resolved `[logging]` section.
///
/// Only the first call has an effect.
pub fn init(config: &LoggingConfig) {
    let settings = config.enabled.then(|| LogSettings {
        path: expand_home(&config.path),
        min_level: crate::config::parse_level(&config.level).unwrap_or(Level::Info),
    });
    let _ = SETTINGS.set(settings);
}

fn settings() -> Option<&'static LogSettings> {
    SETTINGS.get().and_then(Option::as_ref)
}

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

/// A single event line.
#[derive(Debug, Serialize)]
pub struct Event {
    pub timestamp: String,
    pub level: Level,
    /// Workflow or subsystem (e.g. `"energy"`, `"store"`, `"insights"`).
    pub workflow: String,
    /// Short event name (e.g. `"predict"`, `"stale_response"`).
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Event {
    pub fn new(level: Level, workflow: &str, event: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            level,
            workflow: workflow.to_string(),
            event: event.to_string(),
            outcome: None,
            latency_ms: None,
            detail: None,
        }
    }

    pub fn outcome(mut self, outcome: &str) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }

    pub fn latency(mut self, ms: u64) -> Self {
        self.latency_ms = Some(ms);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Write an event if logging is enabled and the level passes the filter.
///
/// Best-effort: failures are silently ignored.
pub fn log_event(event: &Event) {
    let Some(settings) = settings() else {
        return;
    };
    if event.level < settings.min_level {
        return;
    }
    let _ = append_event(&settings.path, event);
}

/// Convenience: log the outcome of a backend or insight request.
pub fn log_request(workflow: &str, call: &str, ok: bool, latency_ms: u64, detail: Option<&str>) {
    let level = if ok { Level::Info } else { Level::Warn };
    let mut event = Event::new(level, workflow, call)
        .outcome(if ok { "ok" } else { "error" })
        .latency(latency_ms);
    if let Some(detail) = detail {
        event = event.detail(detail);
    }
    log_event(&event);
}

/// Convenience: log a response that arrived after a newer request was issued.
pub fn log_stale_response(workflow: &str, token: u64, latest: u64) {
    log_event(
        &Event::new(Level::Info, workflow, "stale_response")
            .outcome("discarded")
            .detail(format!("token {token} superseded by {latest}")),
    );
}

/// Convenience: log a persistence failure that was absorbed.
pub fn log_store_failure(key: &str, error: &anyhow::Error) {
    log_event(
        &Event::new(Level::Warn, "store", "persist")
            .outcome("error")
            .detail(format!("{key}: {error:#}")),
    );
}

fn append_event(path: &PathBuf, event: &Event) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(event)?;
    writeln!(file, "{json}")?;

    Ok(())
}
