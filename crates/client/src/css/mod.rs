//! Grammar-free stylesheet rewriting.
//!
//! ### Scanning
//! - Comments are stripped, then an explicit tokenizer walks the text.
//! - Braces and semicolons are the only structural signals; quoted strings
//!   and parenthesised groups are skipped over so they never split a rule.
//! - At-rule blocks stay opaque. Nothing is parsed recursively.
//!
//! ### Transformation
//! - Ordinary rules get declaration dedup (last wins) and minification.
//! - Excluded selectors are re-emitted byte-for-byte.
//!
//! ### Critical split
//! - Ordinary rules whose selector contains a critical fragment are inlined;
//!   everything else is deferred. Order is preserved on both sides.

pub mod critical;
pub mod minify;
pub mod scanner;
pub mod transform;
pub mod urls;

pub use critical::{Partition, split};
pub use scanner::{Scanner, strip_comments};
pub use transform::{TransformOutcome, is_excluded_selector, transform};
pub use urls::rewrite_urls;

use critsheet_core::OptimizationOptions;
use url::Url;

/// Syntactic kind of a scanned unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// `selector-list { declarations }`
    Ordinary,
    /// `@header { opaque body }`
    AtRuleBlock,
    /// Block-less at-rule such as `@import url(a.css);`
    AtRuleStatement,
    /// Content the scanner could not structure; passed through untouched.
    Verbatim,
}

/// One syntactic unit of a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssRule {
    pub kind: RuleKind,
    /// Selector list for ordinary rules, the `@...` prelude for at-rules.
    pub selector_or_header: String,
    /// Declaration text for ordinary rules; opaque for everything else.
    pub body: String,
    /// Exact text this rule is emitted as.
    pub raw: String,
}

impl CssRule {
    /// Build an ordinary rule whose text is `selector{body}`.
    pub fn ordinary(selector: impl Into<String>, body: impl Into<String>) -> Self {
        let selector = selector.into();
        let body = body.into();
        let raw = format!("{selector}{{{body}}}");
        Self { kind: RuleKind::Ordinary, selector_or_header: selector, body, raw }
    }

    /// Build an at-rule block whose text is `header{body}`.
    pub fn at_rule_block(header: impl Into<String>, body: impl Into<String>) -> Self {
        let header = header.into();
        let body = body.into();
        let raw = format!("{header}{{{body}}}");
        Self { kind: RuleKind::AtRuleBlock, selector_or_header: header, body, raw }
    }

    /// Build a statement at-rule whose text is `statement;`.
    pub fn at_rule_statement(statement: impl Into<String>) -> Self {
        let statement = statement.into();
        let raw = format!("{statement};");
        Self { kind: RuleKind::AtRuleStatement, selector_or_header: statement, body: String::new(), raw }
    }

    pub fn verbatim(text: impl Into<String>) -> Self {
        let raw = text.into();
        Self { kind: RuleKind::Verbatim, selector_or_header: String::new(), body: raw.clone(), raw }
    }

    pub fn is_ordinary(&self) -> bool {
        self.kind == RuleKind::Ordinary
    }

    pub fn to_css(&self) -> &str {
        &self.raw
    }
}

/// Concatenate rules into stylesheet text.
pub fn render(rules: &[CssRule]) -> String {
    rules.iter().map(CssRule::to_css).collect()
}

/// Full per-stylesheet rewrite: scan, transform, then rebase `url(...)`
/// references onto `base`.
///
/// Ordinary rules that end up with no declarations are dropped.
pub fn optimize_stylesheet(css: &str, base: &Url, options: &OptimizationOptions) -> Vec<CssRule> {
    Scanner::new(options)
        .scan(css)
        .into_iter()
        .map(|rule| transform(rule, options).into_rule())
        .filter(|rule| !(rule.is_ordinary() && rule.body.is_empty()))
        .map(|rule| rewrite_urls(rule, base))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/wp-content/themes/site/style.css").unwrap()
    }

    #[test]
    fn test_render_concatenates_raw_text() {
        let rules = vec![CssRule::ordinary("a", "color:red;"), CssRule::at_rule_statement("@charset \"utf-8\"")];
        assert_eq!(render(&rules), "a{color:red;}@charset \"utf-8\";");
    }

    #[test]
    fn test_optimize_stylesheet_end_to_end() {
        let css = "/* theme */\nbody { margin: 0px; margin: 10px; }\n.hero { color: #ffffff; background: rgb(0,0,0); }";
        let rules = optimize_stylesheet(css, &base(), &OptimizationOptions::default());
        assert_eq!(render(&rules), "body{margin:10px;}.hero{color:#fff;background:#000;}");
    }

    #[test]
    fn test_optimize_stylesheet_drops_empty_rules() {
        let rules = optimize_stylesheet(".a { } .b { color: red }", &base(), &OptimizationOptions::default());
        assert_eq!(render(&rules), ".b{color:red;}");
    }

    #[test]
    fn test_optimize_stylesheet_rebases_urls() {
        let rules = optimize_stylesheet(
            ".logo { background: url('img/logo.png') }",
            &base(),
            &OptimizationOptions::default(),
        );
        assert_eq!(
            render(&rules),
            ".logo{background:url('https://example.com/wp-content/themes/site/img/logo.png');}"
        );
    }

    #[test]
    fn test_rescanning_rendered_output_is_stable() {
        let options = OptimizationOptions {
            excluded_selector_substrings: vec!["shiki".into()],
            ..Default::default()
        };
        let css = "@media (max-width: 600px) { .a { color: red } }\n.shiki-code { color: red; }\n.b { padding: 0px }";
        let rules = optimize_stylesheet(css, &base(), &options);
        let rendered = render(&rules);

        let rescanned = Scanner::keep_all().scan(&rendered);
        assert_eq!(rescanned, rules);
    }
}
