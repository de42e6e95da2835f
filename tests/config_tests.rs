//! Integration tests for configuration defaults and environment overrides.
//!
//! # Safety
//!
//! `std::env::set_var` / `remove_var` are `unsafe` in Rust 2024 edition. All
//! env-touching assertions live in a single `#[test]` so no other test in
//! this binary reads the variables concurrently.

use gridsight::config::{self, GridsightConfig};

/// Helper: set an env var (wraps the `unsafe` call).
///
/// # Safety
/// Must only be called from single-threaded test contexts.
unsafe fn set_env(key: &str, val: &str) {
    unsafe { std::env::set_var(key, val) }
}

/// Helper: remove an env var (wraps the `unsafe` call).
///
/// # Safety
/// Must only be called from single-threaded test contexts.
unsafe fn remove_env(key: &str) {
    unsafe { std::env::remove_var(key) }
}

const VARS: [&str; 6] = [
    "GRIDSIGHT_BACKEND_URL",
    "GRIDSIGHT_BACKEND_TIMEOUT_MS",
    "GRIDSIGHT_GEMINI_API_KEY",
    "GRIDSIGHT_INSIGHTS",
    "GRIDSIGHT_STORE_DIR",
    "GRIDSIGHT_LOG_LEVEL",
];

#[test]
fn annotated_default_file_matches_built_in_defaults() {
    let parsed: GridsightConfig = toml::from_str(&GridsightConfig::default_toml()).unwrap();
    let defaults = GridsightConfig::default();

    assert_eq!(parsed.backend.url, defaults.backend.url);
    assert_eq!(parsed.backend.timeout_ms, defaults.backend.timeout_ms);
    assert_eq!(parsed.insights.model, defaults.insights.model);
    assert_eq!(parsed.insights.endpoint, defaults.insights.endpoint);
    assert_eq!(parsed.storage.dir, defaults.storage.dir);
    assert_eq!(parsed.logging.level, defaults.logging.level);
    assert_eq!(parsed.web.addr, defaults.web.addr);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let parsed: GridsightConfig = toml::from_str("[backend]\nurl = \"http://grid:5000\"\n").unwrap();
    assert_eq!(parsed.backend.url, "http://grid:5000");
    assert_eq!(parsed.backend.timeout_ms, GridsightConfig::default().backend.timeout_ms);
    assert!(parsed.insights.enabled);
}

#[test]
fn environment_overrides() {
    unsafe {
        for var in VARS {
            remove_env(var);
        }
    }

    let mut config = GridsightConfig::default();
    config::apply_env_overrides(&mut config);
    assert_eq!(config.backend.url, GridsightConfig::default().backend.url);

    unsafe {
        set_env("GRIDSIGHT_BACKEND_URL", "http://grid.local:5000");
        set_env("GRIDSIGHT_BACKEND_TIMEOUT_MS", "2500");
        set_env("GRIDSIGHT_GEMINI_API_KEY", "secret");
        set_env("GRIDSIGHT_INSIGHTS", "off");
        set_env("GRIDSIGHT_STORE_DIR", "/tmp/gridsight-store");
        set_env("GRIDSIGHT_LOG_LEVEL", "DEBUG");
    }
    config::apply_env_overrides(&mut config);
    assert_eq!(config.backend.url, "http://grid.local:5000");
    assert_eq!(config.backend.timeout_ms, 2500);
    assert_eq!(config.insights.api_key, "secret");
    assert!(!config.insights.enabled);
    assert_eq!(config.storage.dir, "/tmp/gridsight-store");
    assert_eq!(config.logging.level, "debug");

    // Unparsable or empty values leave the current setting alone.
    unsafe {
        set_env("GRIDSIGHT_BACKEND_TIMEOUT_MS", "soon");
        set_env("GRIDSIGHT_BACKEND_URL", "");
        set_env("GRIDSIGHT_LOG_LEVEL", "verbose");
    }
    config::apply_env_overrides(&mut config);
    assert_eq!(config.backend.timeout_ms, 2500);
    assert_eq!(config.backend.url, "http://grid.local:5000");
    assert_eq!(config.logging.level, "debug");

    unsafe {
        for var in VARS {
            remove_env(var);
        }
    }
}
