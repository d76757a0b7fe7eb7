//! css_optimize tool implementation.
//!
//! Runs one delivery pass over a stylesheet queue and returns the plan with
//! ready-to-embed markup.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use critsheet_client::{DeliveryPlan, DeliveryPlanner};
use critsheet_core::{Error, OptimizationOptions, StyleReference};

/// Input parameters for the css_optimize tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CssOptimizeParams {
    /// Stylesheets in page order: `{handle, src, ver?}`.
    pub styles: Vec<StyleReference>,

    /// Options for this pass; the configured options apply when omitted.
    #[serde(default)]
    pub options: Option<OptimizationOptions>,
}

/// Output structure for the css_optimize tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CssOptimizeOutput {
    pub plan: DeliveryPlan,
    /// Handles now served by the plan; the host dequeues these.
    pub handled: Vec<String>,
    /// Critical `<style>` block followed by the bundle preload link.
    pub head_markup: String,
}

/// Implementation of the css_optimize tool.
pub async fn optimize_impl(
    planner: &DeliveryPlanner, defaults: &OptimizationOptions, params: CssOptimizeParams,
) -> Result<CallToolResult, McpError> {
    if let Some(index) = params.styles.iter().position(|s| s.handle.trim().is_empty()) {
        return Err(Error::InvalidInput(format!("styles[{index}].handle cannot be empty")).into());
    }

    let options = params.options.unwrap_or_else(|| defaults.clone());
    let plan = planner.plan(&params.styles, &options).await;

    let output = CssOptimizeOutput {
        handled: plan.handled().map(str::to_string).collect(),
        head_markup: plan.head_markup(),
        plan,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize plan: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
