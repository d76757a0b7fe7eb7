//! Per-rule rewriting: exclusion, declaration dedup, minification.

use critsheet_core::OptimizationOptions;

use super::minify::{minify_at_header, minify_selector, minify_value};
use super::scanner::skip_string;
use super::{CssRule, RuleKind};

/// Selector fragments of integrations that must keep their exact styling.
const PRESERVED_SELECTOR_SUBSTRINGS: &[&str] = &["code-block-pro", "wp-block-kevinbatdorf", "shiki", "cbp-", "dashicons"];

const FONT_AWESOME_SELECTOR_SUBSTRINGS: &[&str] =
    &["fa-", ".fa.", ".fa ", ".fas", ".far", ".fab", "fontawesome", "font-awesome"];

/// Result of [`transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Rewritten(CssRule),
    /// Excluded or opaque; emitted exactly as scanned.
    Unchanged(CssRule),
}

impl TransformOutcome {
    pub fn into_rule(self) -> CssRule {
        match self {
            TransformOutcome::Rewritten(rule) | TransformOutcome::Unchanged(rule) => rule,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, TransformOutcome::Unchanged(_))
    }
}

/// Whether a selector belongs to an always-preserved integration or matches
/// an operator exclusion.
pub fn is_excluded_selector(selector: &str, options: &OptimizationOptions) -> bool {
    // trailing space lets `.fa ` match a selector ending in `.fa`
    let padded = format!("{selector} ");

    PRESERVED_SELECTOR_SUBSTRINGS.iter().any(|s| selector.contains(s))
        || (options.exclude_font_awesome && FONT_AWESOME_SELECTOR_SUBSTRINGS.iter().any(|s| padded.contains(s)))
        || options
            .excluded_selector_substrings
            .iter()
            .filter(|s| !s.is_empty())
            .any(|s| selector.contains(s.as_str()))
}

/// Rewrite one rule. Idempotent: `transform(transform(r)) == transform(r)`.
pub fn transform(rule: CssRule, options: &OptimizationOptions) -> TransformOutcome {
    match rule.kind {
        RuleKind::Ordinary if is_excluded_selector(&rule.selector_or_header, options) => {
            TransformOutcome::Unchanged(rule)
        }
        RuleKind::Ordinary => TransformOutcome::Rewritten(CssRule::ordinary(
            minify_selector(&rule.selector_or_header),
            dedup_declarations(&rule.body),
        )),
        RuleKind::AtRuleBlock => {
            TransformOutcome::Rewritten(CssRule::at_rule_block(minify_at_header(&rule.selector_or_header), rule.body))
        }
        RuleKind::AtRuleStatement => {
            TransformOutcome::Rewritten(CssRule::at_rule_statement(minify_at_header(&rule.selector_or_header)))
        }
        RuleKind::Verbatim => TransformOutcome::Unchanged(rule),
    }
}

struct Declaration {
    key: String,
    property: String,
    value: String,
    important: bool,
}

impl Declaration {
    fn parse(text: &str) -> Option<Self> {
        let (property, value) = text.split_once(':')?;
        let property = property.trim();
        let value = value.trim();
        if property.is_empty() || value.is_empty() {
            return None;
        }

        if property.starts_with("--") {
            return Some(Self {
                key: property.to_string(),
                property: property.to_string(),
                value: value.to_string(),
                important: false,
            });
        }

        let value = minify_value(value);
        let important = value.to_ascii_lowercase().ends_with("!important");
        let property = property.to_ascii_lowercase();
        Some(Self { key: property.clone(), property, value, important })
    }
}

/// Split a declaration block and keep the winning occurrence of each
/// property, emitted as `prop:value;` in winner order.
fn dedup_declarations(body: &str) -> String {
    let mut kept: Vec<Declaration> = Vec::new();

    for text in split_declarations(body) {
        let Some(decl) = Declaration::parse(text) else {
            continue;
        };
        if let Some(pos) = kept.iter().position(|d| d.key == decl.key) {
            if kept[pos].important && !decl.important {
                continue;
            }
            kept.remove(pos);
        }
        kept.push(decl);
    }

    kept.iter().map(|d| format!("{}:{};", d.property, d.value)).collect()
}

/// Split on `;` outside strings and parentheses.
fn split_declarations(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        parts.push(&body[start..]);
    }
    parts
}
