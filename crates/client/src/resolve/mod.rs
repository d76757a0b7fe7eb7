//! Stylesheet source resolution.
//!
//! A reference is normalized to an absolute URL, then looked up on local
//! disk before falling back to a remote fetch:
//!
//! 1. `document_root` + site-relative path
//! 2. `content_dir` + path after the content prefix (`wp-content/`)
//! 3. `theme_dir` + file name
//! 4. [`SourceFetcher`], bounded by `fetch_timeout`
//!
//! Local lookup only applies to URLs on the configured site. Any failure is
//! reported as a source error and the stylesheet is skipped for the pass.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use critsheet_core::{AppConfig, Error, StyleReference};
use url::Url;

use crate::fetch::{normalize_source, site_relative_path};

/// Capability for retrieving remote stylesheet bytes.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, Error>;
}

/// Where local candidates are looked up and how long remote fetches may take.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub site_url: Url,
    pub document_root: Option<PathBuf>,
    pub content_dir: Option<PathBuf>,
    pub content_prefix: String,
    pub theme_dir: Option<PathBuf>,
    pub fetch_timeout: Duration,
}

impl ResolverConfig {
    pub fn new(site_url: Url) -> Self {
        Self {
            site_url,
            document_root: None,
            content_dir: None,
            content_prefix: "wp-content/".to_string(),
            theme_dir: None,
            fetch_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let site_url = config.site_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            site_url,
            document_root: config.document_root.clone(),
            content_dir: config.content_dir.clone(),
            content_prefix: config.content_prefix.clone(),
            theme_dir: config.theme_dir.clone(),
            fetch_timeout: config.timeout(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    Local(PathBuf),
    Remote,
}

/// Stylesheet text plus the absolute URL its relative references resolve against.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub url: Url,
    pub origin: SourceOrigin,
    pub text: String,
}

pub struct SourceResolver {
    config: ResolverConfig,
    fetcher: Arc<dyn SourceFetcher>,
}

impl SourceResolver {
    pub fn new(config: ResolverConfig, fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Absolute URL for a reference's `source_url`.
    pub fn normalize(&self, style: &StyleReference) -> Result<Url, Error> {
        normalize_source(&style.source_url, &self.config.site_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", style.handle)))
    }

    /// Local paths to try for `url`, in priority order.
    pub fn local_candidates(&self, url: &Url) -> Vec<PathBuf> {
        let Some(relative) = site_relative_path(url, &self.config.site_url) else {
            return Vec::new();
        };
        if !is_contained(&relative) {
            tracing::warn!(%url, "refusing local lookup for path escaping the site root");
            return Vec::new();
        }

        let mut candidates = Vec::new();
        if let Some(root) = &self.config.document_root {
            candidates.push(root.join(&relative));
        }
        if let Some(content_dir) = &self.config.content_dir
            && !self.config.content_prefix.is_empty()
            && let Some(idx) = relative.find(&self.config.content_prefix)
        {
            candidates.push(content_dir.join(&relative[idx + self.config.content_prefix.len()..]));
        }
        if let Some(theme_dir) = &self.config.theme_dir
            && let Some(name) = Path::new(&relative).file_name()
        {
            candidates.push(theme_dir.join(name));
        }
        candidates
    }

    /// Fetch the text of one stylesheet.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` when the source cannot be normalized
    /// - `Error::FetchTimeout` when the remote fetch exceeds `fetch_timeout`
    /// - whatever source error the [`SourceFetcher`] reports
    pub async fn resolve(&self, style: &StyleReference) -> Result<ResolvedSource, Error> {
        let url = self.normalize(style)?;

        for candidate in self.local_candidates(&url) {
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            match tokio::fs::read(&candidate).await {
                Ok(bytes) => {
                    tracing::debug!(handle = %style.handle, path = %candidate.display(), "resolved stylesheet locally");
                    return Ok(ResolvedSource { url, origin: SourceOrigin::Local(candidate), text: decode(&bytes) });
                }
                Err(e) => {
                    tracing::warn!(handle = %style.handle, path = %candidate.display(), error = %e, "local stylesheet unreadable");
                }
            }
        }

        let bytes = tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(&url))
            .await
            .map_err(|_| {
                Error::FetchTimeout(format!("{url}: no response within {}ms", self.config.fetch_timeout.as_millis()))
            })??;

        tracing::debug!(handle = %style.handle, %url, bytes = bytes.len(), "resolved stylesheet remotely");
        Ok(ResolvedSource { url, origin: SourceOrigin::Remote, text: decode(&bytes) })
    }
}

fn is_contained(relative: &str) -> bool {
    !relative.contains('\0')
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Lossy UTF-8 decode without a leading byte-order mark.
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
