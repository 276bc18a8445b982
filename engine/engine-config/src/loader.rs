//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STAKECHESS_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from subdirectory)
    "/app/config.toml", // Docker container
];

/// Load the central configuration.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the STAKECHESS_CONFIG environment variable
/// 2. Each entry of `CONFIG_SEARCH_PATHS`
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = Path::new(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_ENV_VAR, path.display());
            return load_from_path(path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// An unreadable or malformed file falls back to the built-in defaults.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u16, u64, usize, ...)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = v,
            Ok(Err(_)) => warn!("Ignoring unparseable {}", $key),
            Err(_) => {}
        }
    };
    // Comma-separated list
    ($config:expr, $section:ident . $field:ident, $key:expr, list) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: STAKECHESS_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.data_dir, "STAKECHESS_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "STAKECHESS_COMMON_LOG_LEVEL");

    // Web
    env_override!(config, web.host, "STAKECHESS_WEB_HOST");
    env_override!(config, web.port, "STAKECHESS_WEB_PORT", parse);
    env_override!(
        config,
        web.allowed_origins,
        "STAKECHESS_WEB_ALLOWED_ORIGINS",
        list
    );

    // Session
    env_override!(
        config,
        session.max_players,
        "STAKECHESS_SESSION_MAX_PLAYERS",
        parse
    );
    env_override!(
        config,
        session.waiting_ttl_secs,
        "STAKECHESS_SESSION_WAITING_TTL_SECS",
        parse
    );
    env_override!(
        config,
        session.cleanup_interval_secs,
        "STAKECHESS_SESSION_CLEANUP_INTERVAL_SECS",
        parse
    );
    env_override!(
        config,
        session.snapshot_interval_secs,
        "STAKECHESS_SESSION_SNAPSHOT_INTERVAL_SECS",
        parse
    );
    env_override!(
        config,
        session.snapshot_file,
        "STAKECHESS_SESSION_SNAPSHOT_FILE"
    );

    config
}
