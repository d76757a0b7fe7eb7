//! Stylesheet source URL normalization.

use url::Url;

/// Error type for source URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Turn a stylesheet `src` into an absolute URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Protocol-relative `//host/...` gets `https:`
/// 3. Root-relative and relative paths are joined onto `site_url`
/// 4. Only `http` and `https` are accepted
/// 5. Remove fragment (#...), keep query string intact
pub fn normalize_source(src: &str, site_url: &Url) -> Result<Url, UrlError> {
    let trimmed = src.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = match trimmed.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("https://{rest}")),
        None => match Url::parse(trimmed) {
            Err(url::ParseError::RelativeUrlWithoutBase) => site_url.join(trimmed),
            other => other,
        },
    };
    let mut parsed = parsed.map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Path of `url` relative to the site root, when `url` lives on the site.
///
/// `https://example.com/blog/wp-content/a.css` against site
/// `https://example.com/blog/` gives `wp-content/a.css`.
pub fn site_relative_path(url: &Url, site_url: &Url) -> Option<String> {
    if url.host_str() != site_url.host_str() || url.port() != site_url.port() {
        return None;
    }
    let site_path = site_url.path().trim_end_matches('/');
    let rest = url.path().strip_prefix(site_path)?;
    if !rest.starts_with('/') {
        return None;
    }
    let relative = rest.trim_start_matches('/');
    if relative.is_empty() { None } else { Some(relative.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_normalize_absolute() {
        let url = normalize_source("https://cdn.example.com/a.css?ver=1", &site()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.css?ver=1");
    }

    #[test]
    fn test_normalize_protocol_relative() {
        let url = normalize_source("//fonts.example.net/css?family=X", &site()).unwrap();
        assert_eq!(url.as_str(), "https://fonts.example.net/css?family=X");
    }

    #[test]
    fn test_normalize_root_relative() {
        let url = normalize_source("/wp-content/themes/site/style.css", &site()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/wp-content/themes/site/style.css");
    }

    #[test]
    fn test_normalize_relative_under_subdirectory_site() {
        let site = Url::parse("https://example.com/blog/").unwrap();
        let url = normalize_source("wp-includes/css/x.css", &site).unwrap();
        assert_eq!(url.as_str(), "https://example.com/blog/wp-includes/css/x.css");
    }

    #[test]
    fn test_normalize_lowercase_host() {
        let url = normalize_source("https://EXAMPLE.COM/a.css", &site()).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_normalize_remove_fragment() {
        let url = normalize_source("https://example.com/a.css#x", &site()).unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_normalize_trim_whitespace() {
        let url = normalize_source("  /a.css  ", &site()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a.css");
    }

    #[test]
    fn test_normalize_unsupported_scheme() {
        let result = normalize_source("file:///etc/passwd", &site());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));

        let result = normalize_source("data:text/css,a{}", &site());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(normalize_source("", &site()), Err(UrlError::Empty)));
        assert!(matches!(normalize_source("   ", &site()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_normalize_invalid() {
        let result = normalize_source("https://exa mple.com/a.css", &site());
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_site_relative_path() {
        let site = Url::parse("https://example.com/blog/").unwrap();
        let url = Url::parse("https://example.com/blog/wp-content/a.css?ver=2").unwrap();
        assert_eq!(site_relative_path(&url, &site).as_deref(), Some("wp-content/a.css"));

        let other = Url::parse("https://cdn.example.com/blog/a.css").unwrap();
        assert_eq!(site_relative_path(&other, &site), None);

        let sibling = Url::parse("https://example.com/blogs/a.css").unwrap();
        assert_eq!(site_relative_path(&sibling, &site), None);
    }

    #[test]
    fn test_site_relative_path_ignores_scheme_mismatch() {
        let site = Url::parse("http://example.com/").unwrap();
        let url = Url::parse("https://example.com/wp-content/a.css").unwrap();
        assert_eq!(site_relative_path(&url, &site).as_deref(), Some("wp-content/a.css"));
    }
}
