//! Which queued stylesheets are left alone entirely.

use critsheet_core::{OptimizationOptions, StyleReference};

/// Integrations whose stylesheets are never touched.
const SKIPPED_HANDLES: &[&str] =
    &["admin-bar", "dashicons", "code-block-pro", "wp-block-kevinbatdorf-code-block-pro", "shiki"];

const FONT_AWESOME_HANDLES: &[&str] = &["font-awesome", "fontawesome", "font-awesome-official"];

/// Reason `style` is skipped for this pass, or `None` when it is processed.
pub fn skip_reason(style: &StyleReference, options: &OptimizationOptions) -> Option<String> {
    let src = style.source_url.trim();
    if src.is_empty() {
        return Some("empty source URL".to_string());
    }

    for pattern in &options.excluded_url_patterns {
        match glob::Pattern::new(pattern) {
            Ok(glob) if glob.matches(src) => {
                return Some(format!("source matches excluded pattern `{pattern}`"));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(%pattern, error = %e, "ignoring invalid URL exclusion pattern"),
        }
    }

    let font_awesome: &[&str] = if options.exclude_font_awesome { FONT_AWESOME_HANDLES } else { &[] };
    for name in SKIPPED_HANDLES.iter().chain(font_awesome) {
        if style.handle.contains(name) {
            return Some(format!("handle matches built-in skip `{name}`"));
        }
        if src.contains(name) {
            return Some(format!("source URL matches built-in skip `{name}`"));
        }
    }

    if options.exclude_font_awesome && style.handle.split(['-', '_']).any(|segment| segment == "fa") {
        return Some("handle matches built-in skip `fa`".to_string());
    }

    None
}
