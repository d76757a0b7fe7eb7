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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `max_concurrency` is 0 or exceeds 64
    /// - `sweep_interval_secs` or `optimization.cache_ttl_seconds` is 0
    /// - `site_url` or `cache_url` does not parse
    /// - an `excluded_url_patterns` entry is not a valid glob
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

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

        if self.max_concurrency == 0 || self.max_concurrency > 64 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".into(),
                reason: "must be between 1 and 64".into(),
            });
        }

        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.optimization.cache_ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "optimization.cache_ttl_seconds".into(),
                reason: "must be greater than 0".into(),
            });
        }

        self.site_url()?;
        self.cache_url()?;

        for pattern in &self.optimization.excluded_url_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::Invalid {
                    field: "optimization.excluded_url_patterns".into(),
                    reason: format!("{pattern}: {e}"),
                });
            }
        }

        if self.optimization.critical_selectors.is_empty() {
            tracing::warn!("critical_selectors is empty; every rule will be deferred to the bundle");
        }

        Ok(())
    }
}
