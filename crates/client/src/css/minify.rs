//! Whitespace and value minification.
//!
//! Quoted strings and `url(...)` arguments are never rewritten.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::scanner::skip_string;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static SELECTOR_COMBINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([,>+~])\s*").expect("valid combinator regex"));

static VALUE_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").expect("valid comma regex"));
static OPEN_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s+").expect("valid paren regex"));
static CLOSE_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+\)").expect("valid paren regex"));
static IMPORTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*!\s*important").expect("valid important regex"));

static ZERO_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[\s,(])[-+]?(?:0+(?:\.0+)?|\.0+)(?:px|rem|em|ex|ch|vmin|vmax|vw|vh|cm|mm|in|pt|pc|q|ms|s|khz|hz|deg|grad|rad|turn)\b",
    )
    .expect("valid zero unit regex")
});

static LONG_HEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([0-9a-fA-F]{6})\b").expect("valid hex regex"));

static RGB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\brgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)").expect("valid rgb regex")
});

/// Math functions where `0px` and `0` are not interchangeable.
const MATH_FUNCTIONS: &[&str] = &["calc(", "clamp(", "min(", "max("];

enum Segment<'a> {
    Plain(&'a str),
    Protected(&'a str),
}

/// Split text into rewritable runs and untouchable strings / `url(...)` calls.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut plain_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        let protected_end = match bytes[i] {
            b'"' | b'\'' => Some(skip_string(bytes, i)),
            b'u' | b'U' if starts_url_call(bytes, i) => Some(url_call_end(bytes, i)),
            _ => None,
        };
        match protected_end {
            Some(end) => {
                if plain_from < i {
                    out.push(Segment::Plain(&text[plain_from..i]));
                }
                out.push(Segment::Protected(&text[i..end]));
                i = end;
                plain_from = end;
            }
            None => i += 1,
        }
    }
    if plain_from < bytes.len() {
        out.push(Segment::Plain(&text[plain_from..]));
    }
    out
}

pub(crate) fn starts_url_call(bytes: &[u8], i: usize) -> bool {
    let preceded_by_ident = i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'-');
    !preceded_by_ident && bytes.len() >= i + 4 && bytes[i..i + 4].eq_ignore_ascii_case(b"url(")
}

/// Index just past the `)` closing the `url(` at `start`.
pub(crate) fn url_call_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 4;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b')' => return i + 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn map_plain(text: &str, f: impl Fn(&str) -> String) -> String {
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(s) => f(s),
            Segment::Protected(s) => s.to_string(),
        })
        .collect()
}

/// Collapse whitespace and tighten list and combinator separators.
pub fn minify_selector(selector: &str) -> String {
    map_plain(selector.trim(), |s| {
        let collapsed = WHITESPACE.replace_all(s, " ");
        SELECTOR_COMBINATOR.replace_all(&collapsed, "$1").into_owned()
    })
}

/// Collapse whitespace in an at-rule prelude.
pub fn minify_at_header(header: &str) -> String {
    map_plain(header.trim(), |s| WHITESPACE.replace_all(s, " ").into_owned())
}

/// Minify one declaration value.
///
/// Rewrites applied outside strings and `url(...)`:
/// - whitespace collapsed, tightened around `,` `(` `)` and `!important`
/// - `rgb(r,g,b)` folded to hex
/// - zero lengths, times and angles lose their unit (not inside math functions)
/// - `#aabbcc` shortened to `#abc`
pub fn minify_value(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    let strip_zero_units = !MATH_FUNCTIONS.iter().any(|f| lower.contains(f));

    map_plain(value.trim(), |s| {
        let s = WHITESPACE.replace_all(s, " ");
        let s = VALUE_COMMA.replace_all(&s, ",");
        let s = OPEN_PAREN.replace_all(&s, "(");
        let s = CLOSE_PAREN.replace_all(&s, ")");
        let s = IMPORTANT.replace_all(&s, "!important");
        let s = RGB.replace_all(&s, fold_rgb);
        let s = if strip_zero_units { ZERO_UNIT.replace_all(&s, "${1}0").into_owned() } else { s.into_owned() };
        LONG_HEX.replace_all(&s, shorten_hex).into_owned()
    })
}

fn fold_rgb(caps: &Captures<'_>) -> String {
    let channels: Option<Vec<u8>> = (1..=3).map(|i| caps[i].parse::<u8>().ok()).collect();
    match channels {
        Some(c) => format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2]),
        None => caps[0].to_string(),
    }
}

fn shorten_hex(caps: &Captures<'_>) -> String {
    let digits = caps[1].as_bytes();
    let pairs_match = digits.chunks(2).all(|pair| pair[0].eq_ignore_ascii_case(&pair[1]));
    if pairs_match {
        let short: String = digits.chunks(2).map(|pair| pair[0] as char).collect();
        format!("#{short}")
    } else {
        caps[0].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_selector() {
        assert_eq!(minify_selector("  .a ,\n .b  >  .c ~ p + span "), ".a,.b>.c~p+span");
        assert_eq!(minify_selector("header   nav a"), "header nav a");
    }

    #[test]
    fn test_minify_selector_preserves_attribute_strings() {
        assert_eq!(minify_selector("a[title=\"x  ,  y\"]  b"), "a[title=\"x  ,  y\"] b");
    }

    #[test]
    fn test_zero_units() {
        assert_eq!(minify_value("0px"), "0");
        assert_eq!(minify_value("0px 0em 10px 0.0rem"), "0 0 10px 0");
        assert_eq!(minify_value("0s"), "0");
        assert_eq!(minify_value("-0px"), "0");
        assert_eq!(minify_value("10px"), "10px");
        assert_eq!(minify_value("0.5em"), "0.5em");
        assert_eq!(minify_value("0%"), "0%");
    }

    #[test]
    fn test_zero_units_kept_in_math_functions() {
        assert_eq!(minify_value("calc(0px + 1em)"), "calc(0px + 1em)");
    }

    #[test]
    fn test_hex_shortening() {
        assert_eq!(minify_value("#ffffff"), "#fff");
        assert_eq!(minify_value("#AABBCC"), "#ABC");
        assert_eq!(minify_value("#abcdef"), "#abcdef");
        assert_eq!(minify_value("#aabbccdd"), "#aabbccdd");
    }

    #[test]
    fn test_rgb_folding() {
        assert_eq!(minify_value("rgb(0,0,0)"), "#000");
        assert_eq!(minify_value("rgb( 18 , 52 , 86 )"), "#123456");
        assert_eq!(minify_value("rgb(300,0,0)"), "rgb(300,0,0)");
    }

    #[test]
    fn test_whitespace_tightening() {
        assert_eq!(minify_value("  1px   solid\n red "), "1px solid red");
        assert_eq!(minify_value("Arial , sans-serif"), "Arial,sans-serif");
        assert_eq!(minify_value("translate( 10px , 20px )"), "translate(10px,20px)");
        assert_eq!(minify_value("red ! important"), "red!important");
    }

    #[test]
    fn test_strings_and_urls_untouched() {
        assert_eq!(minify_value("\"0px  #ffffff\""), "\"0px  #ffffff\"");
        assert_eq!(minify_value("url( a  b.png )  no-repeat"), "url( a  b.png ) no-repeat");
        assert_eq!(minify_value("url(\"x).png\") 0px"), "url(\"x).png\") 0");
    }

    #[test]
    fn test_minify_at_header() {
        assert_eq!(minify_at_header("@media   screen and\n(max-width: 600px) "), "@media screen and (max-width: 600px)");
    }
}
