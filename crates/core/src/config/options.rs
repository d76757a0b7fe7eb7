//! Per-pass optimization options.
//!
//! The host loads these once per render pass and hands the same snapshot to
//! every pipeline call. Nothing in the pipeline reads configuration from
//! anywhere else.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Selector fragments that mark structural, above-the-fold containers.
pub const DEFAULT_CRITICAL_SELECTORS: &[&str] = &[
    "body",
    "header",
    "#masthead",
    ".site-header",
    ".main-navigation",
    ".hero",
    "#hero",
    "wp-block-",
    ".entry-content",
];

/// One week.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 604_800;

/// Stylesheet optimization options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OptimizationOptions {
    /// Master switch; a disabled pass produces an empty plan.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keep conditional at-rule blocks (`@media`, `@supports`, ...).
    #[serde(default = "default_true")]
    pub preserve_media_queries: bool,

    /// Leave Font Awesome stylesheets and selectors untouched.
    #[serde(default = "default_true")]
    pub exclude_font_awesome: bool,

    /// Glob patterns matched against stylesheet source URLs.
    #[serde(default)]
    pub excluded_url_patterns: Vec<String>,

    /// Selector substrings that exempt a rule from rewriting.
    #[serde(default, alias = "excluded_classes")]
    pub excluded_selector_substrings: Vec<String>,

    /// Operator CSS emitted verbatim outside the pipeline.
    #[serde(default)]
    pub custom_css: String,

    /// Maximum age of a cache entry.
    #[serde(default = "default_cache_ttl_seconds", alias = "cache_duration")]
    pub cache_ttl_seconds: u64,

    /// Selector fragments that route a rule into the critical set.
    #[serde(default = "default_critical_selectors")]
    pub critical_selectors: Vec<String>,

    /// Also emit critical rules in the deferred bundle.
    #[serde(default)]
    pub replay_critical_in_bundle: bool,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_critical_selectors() -> Vec<String> {
    DEFAULT_CRITICAL_SELECTORS.iter().map(|s| s.to_string()).collect()
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            preserve_media_queries: true,
            exclude_font_awesome: true,
            excluded_url_patterns: Vec::new(),
            excluded_selector_substrings: Vec::new(),
            custom_css: String::new(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            critical_selectors: default_critical_selectors(),
            replay_critical_in_bundle: false,
        }
    }
}

impl OptimizationOptions {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Canonical text of the options that change transformed output.
    ///
    /// Critical selectors, replay and the TTL are applied after the cache
    /// and are left out. Substring order does not matter.
    pub fn transform_signature(&self) -> String {
        let mut substrings: Vec<&str> = self.excluded_selector_substrings.iter().map(String::as_str).collect();
        substrings.sort_unstable();
        substrings.dedup();
        format!(
            "media={};fa={};keep={}",
            self.preserve_media_queries,
            self.exclude_font_awesome,
            substrings.join("\u{1f}")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = OptimizationOptions::default();
        assert!(options.enabled);
        assert!(options.preserve_media_queries);
        assert!(options.exclude_font_awesome);
        assert!(options.excluded_url_patterns.is_empty());
        assert_eq!(options.cache_ttl(), Duration::from_secs(604_800));
        assert!(options.critical_selectors.iter().any(|s| s == "body"));
        assert!(!options.replay_critical_in_bundle);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: OptimizationOptions =
            serde_json::from_str(r#"{"enabled":false,"excluded_classes":["shiki"]}"#).unwrap();
        assert!(!options.enabled);
        assert_eq!(options.excluded_selector_substrings, vec!["shiki".to_string()]);
        assert!(options.preserve_media_queries);
        assert_eq!(options.cache_ttl_seconds, DEFAULT_CACHE_TTL_SECONDS);
    }

    #[test]
    fn test_transform_signature() {
        let base = OptimizationOptions::default();
        let reordered = OptimizationOptions {
            excluded_selector_substrings: vec!["b".into(), "a".into()],
            ..Default::default()
        };
        let sorted = OptimizationOptions {
            excluded_selector_substrings: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert_eq!(reordered.transform_signature(), sorted.transform_signature());
        assert_ne!(base.transform_signature(), sorted.transform_signature());

        let no_media = OptimizationOptions { preserve_media_queries: false, ..Default::default() };
        assert_ne!(base.transform_signature(), no_media.transform_signature());

        let post_cache_only = OptimizationOptions {
            critical_selectors: vec![".x".into()],
            replay_critical_in_bundle: true,
            cache_ttl_seconds: 1,
            ..Default::default()
        };
        assert_eq!(base.transform_signature(), post_cache_only.transform_signature());
    }
}
