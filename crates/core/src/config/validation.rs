//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `base_path` is non-empty and does not start with `/`
    /// - `cache_name`, `shell_assets` or `data_path_pattern` is empty
    /// - any shell asset does not start with `/`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "scheme must be http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(invalid("base_path", "must start with '/'"));
        }

        if self.cache_name.trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }

        if self.shell_assets.is_empty() {
            return Err(invalid("shell_assets", "must list at least one asset"));
        }
        if let Some(asset) = self.shell_assets.iter().find(|a| !a.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "shell_assets".into(),
                reason: format!("{asset:?} must start with '/'"),
            });
        }

        if self.data_path_pattern.is_empty() {
            return Err(invalid("data_path_pattern", "must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.shell_assets.iter().any(|a| a.contains(&self.data_path_pattern)) {
            tracing::warn!(
                pattern = %self.data_path_pattern,
                "a shell asset matches the data path pattern and will be served network-first"
            );
        }

        Ok(())
    }
}
