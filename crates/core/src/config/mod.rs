//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::generation::GenerationId;
use crate::lifecycle::TakeoverPolicy;
use crate::manifest::Manifest;
use crate::strategy::Strategy;
use crate::worker::WorkerOptions;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Current cache generation. Change it whenever the manifest or the
    /// strategy changes so stale stores are dropped on activation.
    ///
    /// Set via SHELLCACHE_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Assets preloaded at install time: paths relative to `app_root`, or
    /// absolute URLs.
    #[serde(default = "default_manifest")]
    pub manifest: Manifest,

    /// Application root that relative manifest entries and request paths
    /// resolve against. Also defines the origin for basic responses.
    ///
    /// Set via SHELLCACHE_APP_ROOT environment variable.
    #[serde(default = "default_app_root")]
    pub app_root: String,

    /// Resolution strategy: `cache-first` or `network-first`.
    ///
    /// Set via SHELLCACHE_STRATEGY environment variable.
    #[serde(default)]
    pub strategy: Strategy,

    /// Activate right after install instead of waiting for clients of the
    /// previous generation to close.
    ///
    /// Set via SHELLCACHE_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of open clients right after activation. Pages already
    /// loaded under an older generation then run against the new cache.
    ///
    /// Set via SHELLCACHE_CLAIM_CLIENTS environment variable.
    #[serde(default = "default_true")]
    pub claim_clients: bool,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds, enforced by the transport.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_generation() -> String {
    "shell-v1".into()
}

fn default_manifest() -> Manifest {
    Manifest::new(["./", "./index.html", "./manifest.json", "./icon.png"])
}

fn default_app_root() -> String {
    "http://localhost:8080/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
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
            generation: default_generation(),
            manifest: default_manifest(),
            app_root: default_app_root(),
            strategy: Strategy::default(),
            skip_waiting: true,
            claim_clients: true,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
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
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed application root.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `app_root` is not an absolute URL.
    pub fn app_root_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.app_root)
            .map_err(|e| ConfigError::Invalid { field: "app_root".into(), reason: e.to_string() })
    }

    /// Engine options derived from this configuration.
    pub fn worker_options(&self) -> Result<WorkerOptions, ConfigError> {
        let generation = GenerationId::new(self.generation.clone())
            .map_err(|e| ConfigError::Invalid { field: "generation".into(), reason: e.to_string() })?;
        let root = self.app_root_url()?;
        let assets = self
            .manifest
            .resolve(&root)
            .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: e.to_string() })?;

        Ok(WorkerOptions {
            generation,
            assets,
            strategy: self.strategy,
            takeover: TakeoverPolicy { skip_waiting: self.skip_waiting, claim_clients: self.claim_clients },
        })
    }
}
