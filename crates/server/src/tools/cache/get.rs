//! cache_get tool implementation.
//!
//! Retrieves a cached stylesheet or bundle by fingerprint.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use critsheet_core::{CacheStore, Error, Fingerprint};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Fingerprint (64 lowercase hex characters) of a stylesheet or bundle.
    pub fingerprint: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub fingerprint: Fingerprint,
    /// RFC 3339 timestamp of when the entry was written.
    pub created_at: String,
    /// Transformed CSS text.
    pub content: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(store: &dyn CacheStore, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let fingerprint = Fingerprint::parse(params.fingerprint.trim())?;

    let entry = store
        .get(&fingerprint)
        .await?
        .ok_or_else(|| Error::CacheMiss(fingerprint.to_string()))?;

    let created_at = entry.created_at.to_rfc3339();
    let output = CacheGetOutput { fingerprint, created_at, content: entry.into_text()? };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::text_of;
    use critsheet_core::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let params = CacheGetParams { fingerprint: Fingerprint::for_content(b"none").to_string() };

        let err = get_impl(&store, params).await.unwrap_err();
        assert!(err.message.contains("CACHE_MISS"));
    }

    #[tokio::test]
    async fn test_get_impl_rejects_malformed_fingerprint() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let params = CacheGetParams { fingerprint: "../../etc/passwd".to_string() };

        let err = get_impl(&store, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let key = Fingerprint::for_content(b".a{color:red;}");
        store.set(&key, b".a{color:red;}").await.unwrap();

        let params = CacheGetParams { fingerprint: key.to_string() };
        let result = get_impl(&store, params).await.unwrap();
        let output: CacheGetOutput = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(output.fingerprint, key);
        assert_eq!(output.content, ".a{color:red;}");
    }
}
