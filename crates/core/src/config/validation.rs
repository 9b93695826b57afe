//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::generation::GenerationId;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` is empty or contains whitespace
    /// - `app_root` is not an absolute http(s) URL
    /// - a `manifest` entry does not resolve against `app_root`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.is_empty() {
            return Err(ConfigError::Missing {
                field: "generation".into(),
                hint: "Set SHELLCACHE_GENERATION environment variable".into(),
            });
        }
        GenerationId::new(self.generation.clone())
            .map_err(|e| ConfigError::Invalid { field: "generation".into(), reason: e.to_string() })?;

        let root = self.app_root_url()?;
        if !matches!(root.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "app_root".into(),
                reason: format!("unsupported scheme: {}", root.scheme()),
            });
        }
        if root.cannot_be_a_base() {
            return Err(ConfigError::Invalid { field: "app_root".into(), reason: "must be a base URL".into() });
        }

        self.manifest
            .resolve(&root)
            .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: e.to_string() })?;

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let duplicates = self.manifest.duplicates(&root);
        if !duplicates.is_empty() {
            tracing::warn!(?duplicates, "manifest lists the same asset more than once");
        }

        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; nothing will be available offline until first fetched");
        }

        Ok(())
    }
}
