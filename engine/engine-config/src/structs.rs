//! Configuration struct definitions.

use crate::defaults;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// Serde default functions, backed by the embedded defaults

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_host() -> String {
    defaults::host().into()
}
fn d_port() -> u16 {
    defaults::port()
}
fn d_allowed_origins() -> Vec<String> {
    defaults::allowed_origins().to_vec()
}
fn d_max_players() -> usize {
    defaults::max_players()
}
fn d_waiting_ttl() -> u64 {
    defaults::waiting_ttl_secs()
}
fn d_cleanup_interval() -> u64 {
    defaults::cleanup_interval_secs()
}
fn d_snapshot_interval() -> u64 {
    defaults::snapshot_interval_secs()
}
fn d_snapshot_file() -> String {
    defaults::snapshot_file().into()
}

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

impl CentralConfig {
    /// Where the session snapshot lives: `session.snapshot_file` under
    /// `common.data_dir`, unless the file name is already absolute.
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.common.data_dir).join(&self.session.snapshot_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Web server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    /// CORS allowed origins. Empty = allow all origins (development mode with warning).
    #[serde(default = "d_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: defaults::host().into(),
            port: defaults::port(),
            allowed_origins: defaults::allowed_origins().to_vec(),
        }
    }
}

/// Session lifecycle and persistence settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionSettings {
    /// Seats per session when a create request does not say otherwise
    #[serde(default = "d_max_players")]
    pub max_players: usize,
    #[serde(default = "d_waiting_ttl")]
    pub waiting_ttl_secs: u64,
    #[serde(default = "d_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// 0 disables periodic snapshots; a final snapshot is still written on shutdown
    #[serde(default = "d_snapshot_interval")]
    pub snapshot_interval_secs: u64,
    #[serde(default = "d_snapshot_file")]
    pub snapshot_file: String,
}

impl SessionSettings {
    pub fn waiting_ttl(&self) -> Duration {
        Duration::from_secs(self.waiting_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn snapshot_interval(&self) -> Option<Duration> {
        (self.snapshot_interval_secs > 0).then(|| Duration::from_secs(self.snapshot_interval_secs))
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_players: defaults::max_players(),
            waiting_ttl_secs: defaults::waiting_ttl_secs(),
            cleanup_interval_secs: defaults::cleanup_interval_secs(),
            snapshot_interval_secs: defaults::snapshot_interval_secs(),
            snapshot_file: defaults::snapshot_file().into(),
        }
    }
}
