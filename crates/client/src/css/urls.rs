//! Rebase relative `url(...)` references onto the stylesheet's location.

use url::Url;

use super::CssRule;
use super::minify::{starts_url_call, url_call_end};
use super::scanner::skip_string;

/// Rewrite every relative `url(...)` in `rule` against `base`.
///
/// Skipped: empty targets, `data:` URIs, fragment-only references,
/// protocol-relative URLs and anything that already carries a scheme.
pub fn rewrite_urls(rule: CssRule, base: &Url) -> CssRule {
    if !rule.raw.to_ascii_lowercase().contains("url(") {
        return rule;
    }
    CssRule {
        kind: rule.kind,
        selector_or_header: rewrite_text(&rule.selector_or_header, base),
        body: rewrite_text(&rule.body, base),
        raw: rewrite_text(&rule.raw, base),
    }
}

fn rewrite_text(text: &str, base: &Url) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'u' | b'U' if starts_url_call(bytes, i) => {
                let end = url_call_end(bytes, i);
                if let Some(rewritten) = rewrite_call(&text[i..end], base) {
                    out.push_str(&text[copied_from..i]);
                    out.push_str(&rewritten);
                    copied_from = end;
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[copied_from..]);
    out
}

/// `call` is a full `url(...)` span; returns `None` when it stays as-is.
fn rewrite_call(call: &str, base: &Url) -> Option<String> {
    let inner = call.get(4..)?.strip_suffix(')')?.trim();
    let bytes = inner.as_bytes();
    let quoted = bytes.len() >= 2 && matches!(bytes[0], b'"' | b'\'') && bytes[bytes.len() - 1] == bytes[0];
    let (quote, target) = if quoted { (&inner[..1], &inner[1..inner.len() - 1]) } else { ("", inner) };

    if !is_rebasable(target) {
        return None;
    }
    let resolved = base.join(target).ok()?;
    Some(format!("url({quote}{resolved}{quote})"))
}

fn is_rebasable(target: &str) -> bool {
    !(target.is_empty()
        || target.starts_with('#')
        || target.starts_with("//")
        || target.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
        || has_scheme(target))
}

fn has_scheme(target: &str) -> bool {
    match target.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
