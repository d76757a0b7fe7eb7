//! HTML fragments the host embeds in the page head.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").expect("valid element regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*(?:>|$)").expect("valid tag regex"));

/// Inline `<style>` block for critical CSS; empty when there is none.
pub fn critical_markup(css: &str) -> String {
    if css.trim().is_empty() {
        return String::new();
    }
    format!("<style id='critical-css'>\n{}\n</style>\n", escape_style_text(css))
}

/// Preload link that swaps itself to a stylesheet once loaded, with a
/// `<noscript>` fallback.
pub fn bundle_markup(href: &str) -> String {
    let href = escape_attr(href);
    format!(
        "<link rel='preload' href='{href}' as='style' onload=\"this.onload=null;this.rel='stylesheet'\">\n\
         <noscript><link rel='stylesheet' href='{href}'></noscript>\n"
    )
}

/// Operator CSS with any markup removed, wrapped for output after the
/// optimized styles; empty input yields an empty string.
pub fn custom_css_markup(css: &str) -> String {
    let without_elements = SCRIPT_OR_STYLE.replace_all(css, "");
    let text = TAG.replace_all(&without_elements, "");
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    format!("\n<!-- critsheet custom CSS -->\n<style type='text/css'>\n{text}\n</style>\n")
}

/// Keep stylesheet text from closing its `<style>` element early.
fn escape_style_text(css: &str) -> String {
    css.replace("</", "<\\/")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('\'', "&#39;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}
