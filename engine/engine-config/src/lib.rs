//! Centralized configuration loading from config.toml.
//!
//! Shared by the web server and any other binary that hosts a session
//! registry.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`STAKECHESS_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! STAKECHESS_<SECTION>_<KEY>=value
//!
//! Examples:
//!     STAKECHESS_COMMON_DATA_DIR=/data
//!     STAKECHESS_WEB_PORT=3000
//!     STAKECHESS_WEB_ALLOWED_ORIGINS=https://a.example,https://b.example
//!     STAKECHESS_SESSION_WAITING_TTL_SECS=3600
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_ENV_VAR, CONFIG_SEARCH_PATHS};
pub use structs::*;
