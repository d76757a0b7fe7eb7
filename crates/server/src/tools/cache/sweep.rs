//! cache_sweep tool implementation.
//!
//! Deletes expired entries, or every entry when `all` is set.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use critsheet_core::{CacheStore, Error};

/// Parameters for the cache_sweep tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepParams {
    /// Delete every entry regardless of age (default: false).
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_sweep tool.
pub async fn sweep_impl(store: &dyn CacheStore, params: CacheSweepParams) -> Result<CallToolResult, McpError> {
    let deleted = if params.all { store.clear().await? } else { store.sweep().await? };
    tracing::info!(deleted, all = params.all, "cache sweep requested");

    let output = CacheSweepOutput { deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
