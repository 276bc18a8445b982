//! Default configuration values loaded from config.defaults.toml.
//!
//! The file is embedded at compile time so a binary runs without any config
//! on disk.

use once_cell::sync::Lazy;
use serde::Deserialize;

const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed once at first use
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    web: WebDefaults,
    session: SessionDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct WebDefaults {
    host: String,
    port: u16,
    allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SessionDefaults {
    max_players: usize,
    waiting_ttl_secs: u64,
    cleanup_interval_secs: u64,
    snapshot_interval_secs: u64,
    snapshot_file: String,
}

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Web
pub fn host() -> &'static str {
    &DEFAULTS.web.host
}
pub fn port() -> u16 {
    DEFAULTS.web.port
}
pub fn allowed_origins() -> &'static [String] {
    &DEFAULTS.web.allowed_origins
}

// Session
pub fn max_players() -> usize {
    DEFAULTS.session.max_players
}
pub fn waiting_ttl_secs() -> u64 {
    DEFAULTS.session.waiting_ttl_secs
}
pub fn cleanup_interval_secs() -> u64 {
    DEFAULTS.session.cleanup_interval_secs
}
pub fn snapshot_interval_secs() -> u64 {
    DEFAULTS.session.snapshot_interval_secs
}
pub fn snapshot_file() -> &'static str {
    &DEFAULTS.session.snapshot_file
}
