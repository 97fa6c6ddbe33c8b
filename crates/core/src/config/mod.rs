//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TOP10_*)
//! 2. TOML config file (if TOP10_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The shell asset list and the cache name ship together: bumping
//! `cache_name` whenever `shell_assets` changes is what retires the previous
//! generation on the next activation.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Shell assets of the published site, relative to `base_path`.
pub const DEFAULT_SHELL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/style.css",
    "/script.js",
    "/asserts/Netflix_Logo.png",
    "/asserts/top10.svg",
    "/file_manifest.json",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TOP10_*)
/// 2. TOML config file (if TOP10_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scheme and host the site is served from.
    ///
    /// Set via TOP10_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix the site lives under on the origin.
    ///
    /// Set via TOP10_BASE_PATH environment variable.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Name of the current cache generation.
    ///
    /// Set via TOP10_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Ordered shell assets, relative to `base_path`.
    #[serde(default = "default_shell_assets")]
    pub shell_assets: Vec<String>,

    /// URL fragment identifying dated catalog snapshots.
    ///
    /// Set via TOP10_DATA_PATH_PATTERN environment variable.
    #[serde(default = "default_data_path_pattern")]
    pub data_path_pattern: String,

    /// Path to SQLite cache database.
    ///
    /// Set via TOP10_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via TOP10_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via TOP10_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via TOP10_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Activate a freshly installed generation without waiting for the
    /// previous one to be released.
    ///
    /// Set via TOP10_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,
}

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_base_path() -> String {
    "/NetflixTop10Global_PWA".into()
}

fn default_cache_name() -> String {
    "netflix-top10-cache-v1".into()
}

fn default_shell_assets() -> Vec<String> {
    DEFAULT_SHELL_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_data_path_pattern() -> String {
    "/HTML_Json/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./top10-offline-cache.sqlite")
}

fn default_user_agent() -> String {
    "top10-offline/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            base_path: default_base_path(),
            cache_name: default_cache_name(),
            shell_assets: default_shell_assets(),
            data_path_pattern: default_data_path_pattern(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            skip_waiting: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Layered figment without extraction, for callers that add providers.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TOP10_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("TOP10_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a config from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
