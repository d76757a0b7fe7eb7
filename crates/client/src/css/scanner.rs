//! Stylesheet tokenizer.
//!
//! Edge-case policy:
//! - `{`, `}` and `;` are the only structural characters, and only outside
//!   quoted strings. `;` inside `(...)` or `[...]` does not end a prelude.
//! - Block ends are found by brace balance, so an at-rule's nested rules stay
//!   inside its opaque body and are never emitted twice.
//! - A stray `}` is skipped. An unterminated block runs to end of input and
//!   is closed. A trailing prelude without a block is dropped, as is a block
//!   with an empty prelude.
//! - An ordinary rule whose body contains a nested block becomes
//!   [`RuleKind::Verbatim`].
//! - Input with no block and no `@` statement (bare declarations, prose)
//!   becomes one verbatim rule.

use critsheet_core::OptimizationOptions;

use super::{CssRule, RuleKind};

/// Conditional group at-rules governed by `preserve_media_queries`.
const CONDITIONAL_AT_RULES: &[&str] =
    &["media", "supports", "container", "layer", "document", "-moz-document", "scope", "starting-style"];

/// Splits stylesheet text into ordered [`CssRule`]s.
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    keep_conditional_blocks: bool,
}

impl Scanner {
    pub fn new(options: &OptimizationOptions) -> Self {
        Self { keep_conditional_blocks: options.preserve_media_queries }
    }

    /// Scanner that keeps every at-rule block; used on already-filtered text.
    pub fn keep_all() -> Self {
        Self { keep_conditional_blocks: true }
    }

    pub fn scan(&self, css: &str) -> Vec<CssRule> {
        let stripped = strip_comments(css);
        let text = stripped.trim_start_matches('\u{feff}');

        let (rules, saw_boundary) = self.scan_units(text);
        if !saw_boundary && !text.trim().is_empty() {
            return vec![CssRule::verbatim(text.trim())];
        }
        rules
    }

    fn scan_units(&self, text: &str) -> (Vec<CssRule>, bool) {
        let bytes = text.as_bytes();
        let len = bytes.len();
        let mut rules = Vec::new();
        let mut saw_boundary = false;
        let mut pos = 0;

        while pos < len {
            let b = bytes[pos];
            if b.is_ascii_whitespace() || b == b'}' || b == b';' {
                pos += 1;
                continue;
            }

            let start = pos;
            let Some(delim) = find_prelude_end(bytes, pos) else {
                break;
            };
            let prelude = text[start..delim].trim();

            match bytes[delim] {
                b'}' => {
                    pos = delim + 1;
                }
                b';' => {
                    if prelude.starts_with('@') {
                        saw_boundary = true;
                        rules.push(CssRule {
                            kind: RuleKind::AtRuleStatement,
                            selector_or_header: prelude.to_string(),
                            body: String::new(),
                            raw: text[start..=delim].to_string(),
                        });
                    }
                    pos = delim + 1;
                }
                _ => {
                    saw_boundary = true;
                    let (body, raw, next) = match find_block_end(bytes, delim) {
                        Some(close) => (&text[delim + 1..close], text[start..=close].to_string(), close + 1),
                        None => (&text[delim + 1..], format!("{}}}", text[start..].trim_end()), len),
                    };
                    pos = next;

                    if prelude.is_empty() {
                        continue;
                    }
                    if prelude.starts_with('@') {
                        if self.keep_conditional_blocks || !is_conditional(prelude) {
                            rules.push(CssRule {
                                kind: RuleKind::AtRuleBlock,
                                selector_or_header: prelude.to_string(),
                                body: body.to_string(),
                                raw,
                            });
                        }
                    } else if contains_block(body) {
                        rules.push(CssRule::verbatim(raw));
                    } else {
                        rules.push(CssRule {
                            kind: RuleKind::Ordinary,
                            selector_or_header: prelude.to_string(),
                            body: body.to_string(),
                            raw,
                        });
                    }
                }
            }
        }

        (rules, saw_boundary)
    }
}

/// Remove `/* ... */` comments, leaving quoted strings intact.
///
/// An unterminated comment swallows the rest of the input.
pub fn strip_comments(css: &str) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut copied_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&css[copied_from..i]);
                let end = css[i + 2..].find("*/").map(|p| i + 2 + p + 2).unwrap_or(bytes.len());
                i = end;
                copied_from = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&css[copied_from..]);
    out
}

/// Index just past the string starting at `start` (which holds the quote).
///
/// Strings end at the matching quote or, unterminated, at a newline.
pub(crate) fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// First `{`, `}` or top-level `;` at or after `pos`.
fn find_prelude_end(bytes: &[u8], pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'{' | b'}' => return Some(i),
            b';' if depth == 0 => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the `}` balancing the `{` at `open`.
fn find_block_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn contains_block(body: &str) -> bool {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => return true,
            _ => {}
        }
        i += 1;
    }
    false
}

fn is_conditional(header: &str) -> bool {
    let name: String = header[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    CONDITIONAL_AT_RULES.contains(&name.as_str())
}
