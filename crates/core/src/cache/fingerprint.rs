//! Content-addressed cache key generation.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, OptimizationOptions, StyleReference};

/// Lowercase hex SHA-256 used as a cache key and bundle file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Key for one stylesheet, derived from its identity only.
    pub fn for_stylesheet(handle: &str, source_url: &str, version: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(handle.as_bytes());
        hasher.update(b"\n");
        hasher.update(source_url.as_bytes());
        hasher.update(b"\n");
        hasher.update(version.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn for_style(style: &StyleReference) -> Self {
        Self::for_stylesheet(&style.handle, &style.source_url, style.version_str())
    }

    /// Key for one stylesheet as transformed under `options`.
    ///
    /// Passes that differ only in post-cache options (critical selectors,
    /// replay, TTL) share entries.
    pub fn for_transformed(style: &StyleReference, options: &OptimizationOptions) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(Self::for_style(style).as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(options.transform_signature().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Key for rendered content such as a merged bundle.
    pub fn for_content(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    /// Accept a caller-supplied key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFingerprint` unless the input is exactly 64
    /// lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let valid = input.len() == 64 && input.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid { Ok(Self(input.to_string())) } else { Err(Error::InvalidFingerprint) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<fingerprint>.css`
    pub fn file_name(&self) -> String {
        format!("{}.css", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Fingerprint::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let a = Fingerprint::for_stylesheet("theme", "https://example.com/style.css", "1.0");
        let b = Fingerprint::for_stylesheet("theme", "https://example.com/style.css", "1.0");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_different_version() {
        let a = Fingerprint::for_stylesheet("theme", "https://example.com/style.css", "1.0");
        let b = Fingerprint::for_stylesheet("theme", "https://example.com/style.css", "1.1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_different_handle() {
        let a = Fingerprint::for_stylesheet("theme", "/style.css", "");
        let b = Fingerprint::for_stylesheet("child", "/style.css", "");
        assert_ne!(a, b);
    }

    #[test]
    fn test_for_style_matches_parts() {
        let style = StyleReference::new("theme", "/style.css").with_version("2");
        assert_eq!(Fingerprint::for_style(&style), Fingerprint::for_stylesheet("theme", "/style.css", "2"));
    }

    #[test]
    fn test_for_transformed_tracks_transform_options() {
        let style = StyleReference::new("theme", "/style.css").with_version("2");
        let base = OptimizationOptions::default();
        let key = Fingerprint::for_transformed(&style, &base);

        assert_ne!(key, Fingerprint::for_style(&style));
        assert_eq!(key, Fingerprint::for_transformed(&style, &base.clone()));

        let no_media = OptimizationOptions { preserve_media_queries: false, ..Default::default() };
        assert_ne!(key, Fingerprint::for_transformed(&style, &no_media));

        let other_critical = OptimizationOptions { critical_selectors: vec![".x".into()], ..Default::default() };
        assert_eq!(key, Fingerprint::for_transformed(&style, &other_critical));
    }

    #[test]
    fn test_hash_format() {
        let fp = Fingerprint::for_content(b"body{margin:0;}");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp.file_name(), format!("{fp}.css"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let fp = Fingerprint::for_content(b"a");
        assert_eq!(Fingerprint::parse(fp.as_str()).unwrap(), fp);
    }

    #[test]
    fn test_parse_rejects_path_like_keys() {
        assert!(matches!(Fingerprint::parse("../etc/passwd"), Err(Error::InvalidFingerprint)));
        assert!(matches!(Fingerprint::parse(&"A".repeat(64)), Err(Error::InvalidFingerprint)));
        assert!(matches!(Fingerprint::parse("abc"), Err(Error::InvalidFingerprint)));
    }
}
