//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CRITSHEET_*)
//! 2. TOML config file (if CRITSHEET_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod options;
mod validation;

pub use options::{DEFAULT_CACHE_TTL_SECONDS, DEFAULT_CRITICAL_SELECTORS, OptimizationOptions};
pub use validation::ConfigError;

/// Which backing medium the cache store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One `<fingerprint>.css` file per entry under `cache_dir`.
    #[default]
    File,
    /// SQLite keyed store at `db_path`.
    Sqlite,
    /// Process-local map; lost on restart.
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CRITSHEET_*, nested keys split on `__`)
/// 2. TOML config file (if CRITSHEET_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding cached stylesheets and bundles.
    ///
    /// Set via CRITSHEET_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cache backing medium.
    ///
    /// Set via CRITSHEET_CACHE_BACKEND environment variable.
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Path to the SQLite database when `cache_backend = "sqlite"`.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Public URL under which `cache_dir` is served.
    ///
    /// Bundle handles carry an `href` only when this is set.
    #[serde(default)]
    pub cache_url: Option<String>,

    /// Base URL of the site; root-relative stylesheet references resolve against it.
    ///
    /// Set via CRITSHEET_SITE_URL environment variable.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Filesystem directory the site is served from.
    #[serde(default)]
    pub document_root: Option<PathBuf>,

    /// Content directory (plugins, themes, uploads).
    #[serde(default)]
    pub content_dir: Option<PathBuf>,

    /// URL path prefix that maps onto `content_dir`.
    #[serde(default = "default_content_prefix")]
    pub content_prefix: String,

    /// Active theme directory, searched by basename as a last resort.
    #[serde(default)]
    pub theme_dir: Option<PathBuf>,

    /// User-Agent string for remote stylesheet fetches.
    ///
    /// Set via CRITSHEET_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per remote stylesheet.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Remote fetch timeout in milliseconds.
    ///
    /// Set via CRITSHEET_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum stylesheets resolved concurrently within one pass.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Interval between cache sweeps run by the server.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Pipeline options.
    ///
    /// Nested keys via CRITSHEET_OPTIMIZATION__<FIELD>.
    #[serde(default)]
    pub optimization: OptimizationOptions,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./critsheet-cache")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./critsheet-cache.sqlite")
}

fn default_site_url() -> String {
    "http://localhost/".into()
}

fn default_content_prefix() -> String {
    "wp-content/".into()
}

fn default_user_agent() -> String {
    "critsheet/0.1".into()
}

fn default_max_bytes() -> usize {
    2_097_152 // 2MB
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrency() -> usize {
    4
}

fn default_sweep_interval_secs() -> u64 {
    86_400 // daily
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_backend: CacheBackend::default(),
            db_path: default_db_path(),
            cache_url: None,
            site_url: default_site_url(),
            document_root: None,
            content_dir: None,
            content_prefix: default_content_prefix(),
            theme_dir: None,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            sweep_interval_secs: default_sweep_interval_secs(),
            optimization: OptimizationOptions::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CRITSHEET_`
    /// 2. TOML file from `CRITSHEET_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CRITSHEET_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CRITSHEET_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed site URL (validated by [`AppConfig::validate`]).
    pub fn site_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.site_url)
            .map_err(|e| ConfigError::Invalid { field: "site_url".into(), reason: e.to_string() })
    }

    /// Parsed cache URL, with a trailing slash so file names join beneath it.
    pub fn cache_url(&self) -> Result<Option<url::Url>, ConfigError> {
        self.cache_url
            .as_deref()
            .map(|raw| {
                let with_slash = if raw.ends_with('/') { raw.to_string() } else { format!("{raw}/") };
                url::Url::parse(&with_slash)
                    .map_err(|e| ConfigError::Invalid { field: "cache_url".into(), reason: e.to_string() })
            })
            .transpose()
    }
}
