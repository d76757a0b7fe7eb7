//! Critical-path extraction.

use super::CssRule;

/// Rules split by whether they are needed for first paint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub critical: Vec<CssRule>,
    pub non_critical: Vec<CssRule>,
}

/// Partition `rules` by substring match of each ordinary selector against
/// `patterns`. Relative order is preserved on both sides; at-rules and
/// verbatim rules are never critical.
pub fn split<S: AsRef<str>>(rules: Vec<CssRule>, patterns: &[S]) -> Partition {
    let mut partition = Partition::default();
    for rule in rules {
        if is_critical(&rule, patterns) {
            partition.critical.push(rule);
        } else {
            partition.non_critical.push(rule);
        }
    }
    partition
}

fn is_critical<S: AsRef<str>>(rule: &CssRule, patterns: &[S]) -> bool {
    rule.is_ordinary()
        && patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.is_empty())
            .any(|p| rule.selector_or_header.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use critsheet_core::config::DEFAULT_CRITICAL_SELECTORS;

    fn rules() -> Vec<CssRule> {
        vec![
            CssRule::ordinary("body", "margin:0;"),
            CssRule::ordinary(".footer", "color:red;"),
            CssRule::at_rule_block("@media print", ".hero{display:none}"),
            CssRule::ordinary(".hero h1", "font-size:3rem;"),
            CssRule::verbatim("junk body"),
            CssRule::ordinary(".wp-block-group", "padding:0;"),
            CssRule::ordinary(".sidebar", "width:30%;"),
        ]
    }

    #[test]
    fn test_split_by_default_selectors() {
        let partition = split(rules(), DEFAULT_CRITICAL_SELECTORS);
        let critical: Vec<_> = partition.critical.iter().map(|r| r.selector_or_header.as_str()).collect();
        assert_eq!(critical, vec!["body", ".hero h1", ".wp-block-group"]);
        assert_eq!(partition.non_critical.len(), 4);
        assert_eq!(partition.non_critical[1].kind, crate::css::RuleKind::AtRuleBlock);
    }

    #[test]
    fn test_partition_is_complete_and_ordered() {
        let input = rules();
        let partition = split(input.clone(), DEFAULT_CRITICAL_SELECTORS);
        assert_eq!(partition.critical.len() + partition.non_critical.len(), input.len());

        let mut merged = Vec::new();
        let (mut c, mut n) = (partition.critical.iter().peekable(), partition.non_critical.iter().peekable());
        for rule in &input {
            if c.peek() == Some(&rule) {
                merged.push(c.next().unwrap().clone());
            } else {
                assert_eq!(n.peek(), Some(&rule));
                merged.push(n.next().unwrap().clone());
            }
        }
        assert_eq!(merged, input);
    }

    #[test]
    fn test_no_patterns_means_nothing_critical() {
        let partition = split(rules(), &[] as &[&str]);
        assert!(partition.critical.is_empty());

        let partition = split(rules(), &[""]);
        assert!(partition.critical.is_empty());
    }
}
