//! Stylesheet references queued by the host for one render pass.

use serde::{Deserialize, Serialize};

/// One stylesheet as queued by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StyleReference {
    /// Host-assigned handle (e.g. `theme-style`).
    pub handle: String,
    /// Source URL as registered; may be absolute, protocol-relative or root-relative.
    #[serde(alias = "src")]
    pub source_url: String,
    /// Optional version string appended by the host for cache busting.
    #[serde(default, alias = "ver")]
    pub version: Option<String>,
}

impl StyleReference {
    pub fn new(handle: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self { handle: handle.into(), source_url: source_url.into(), version: None }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn version_str(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }
}
