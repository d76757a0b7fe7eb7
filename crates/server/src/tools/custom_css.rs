//! custom_css tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use critsheet_client::custom_css_markup;
use critsheet_core::{Error, OptimizationOptions};

/// Parameters for the custom_css tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CustomCssParams {
    /// CSS to render instead of the configured `custom_css`.
    #[serde(default)]
    pub css: Option<String>,
}

/// Output from the custom_css tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CustomCssOutput {
    /// `<style>` block to emit after the optimized styles; empty when unset.
    pub markup: String,
}

pub fn custom_css_impl(options: &OptimizationOptions, params: CustomCssParams) -> Result<CallToolResult, McpError> {
    let css = params.css.as_deref().unwrap_or(&options.custom_css);
    let output = CustomCssOutput { markup: custom_css_markup(css) };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
