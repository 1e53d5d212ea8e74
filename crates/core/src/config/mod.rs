//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BLOG_SYNC_*)
//! 2. TOML config file (if BLOG_SYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BLOG_SYNC_*)
/// 2. TOML config file (if BLOG_SYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database.
    ///
    /// Set via BLOG_SYNC_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the devpad projects API. `/projects` is appended.
    ///
    /// Set via BLOG_SYNC_DEVPAD_API_URL environment variable.
    /// Required only when projects are fetched.
    #[serde(default)]
    pub devpad_api_url: Option<String>,

    /// User-Agent string for outbound requests.
    ///
    /// Set via BLOG_SYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Outbound HTTP deadline in milliseconds.
    ///
    /// Set via BLOG_SYNC_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body accepted from upstream APIs.
    ///
    /// Set via BLOG_SYNC_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional freshness window for fetched project caches, in seconds.
    ///
    /// When unset, the latest `fetched` record is served regardless of age.
    /// Set via BLOG_SYNC_PROJECT_CACHE_TTL_SECS environment variable.
    #[serde(default)]
    pub project_cache_ttl_secs: Option<u64>,

    /// Category assigned to posts created by article sync.
    ///
    /// Set via BLOG_SYNC_SYNC_CATEGORY environment variable.
    #[serde(default = "default_sync_category")]
    pub sync_category: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./blog-sync.sqlite")
}

fn default_user_agent() -> String {
    "blog-sync/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_sync_category() -> String {
    "devlog".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            devpad_api_url: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            project_cache_ttl_secs: None,
            sync_category: default_sync_category(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Freshness window for project caches, if one is configured.
    pub fn project_cache_ttl(&self) -> Option<chrono::Duration> {
        self.project_cache_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BLOG_SYNC_`
    /// 2. TOML file from `BLOG_SYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BLOG_SYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BLOG_SYNC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Devpad API base URL (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the URL is not set.
    pub fn require_devpad_api_url(&self) -> Result<&str, ConfigError> {
        self.devpad_api_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "devpad_api_url".into(),
            hint: "Set BLOG_SYNC_DEVPAD_API_URL environment variable".into(),
        })
    }
}
