//! MCP tool implementations.
//!
//! This module contains all tools exposed by the critsheet server.

pub mod cache;
pub mod custom_css;
pub mod optimize;

pub use cache::{CacheGetParams, CacheSweepParams};
pub use custom_css::CustomCssParams;
pub use optimize::CssOptimizeParams;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use critsheet_client::{DeliveryPlanner, ResolverConfig, SourceFetcher, SourceResolver};
    use critsheet_core::{Error, MemoryStore};
    use rmcp::model::CallToolResult;
    use url::Url;

    struct MapFetcher(HashMap<String, String>);

    #[async_trait::async_trait]
    impl SourceFetcher for MapFetcher {
        async fn fetch(&self, url: &Url) -> Result<Bytes, Error> {
            self.0
                .get(url.as_str())
                .map(|b| Bytes::from(b.clone()))
                .ok_or_else(|| Error::HttpError(format!("{url}: status 404")))
        }
    }

    /// Planner over an in-memory store, resolving `https://example.com/` sources from `sources`.
    pub fn planner_with_sources(sources: &[(&str, &str)]) -> DeliveryPlanner {
        let fetcher = MapFetcher(sources.iter().map(|(u, b)| (u.to_string(), b.to_string())).collect());
        let site = Url::parse("https://example.com/").unwrap();
        let resolver = SourceResolver::new(ResolverConfig::new(site), Arc::new(fetcher));
        DeliveryPlanner::new(Arc::new(resolver), Arc::new(MemoryStore::new(Duration::from_secs(3600))))
    }

    /// Text payload of the first content item.
    pub fn text_of(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }
}
