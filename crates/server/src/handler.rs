//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use critsheet_client::DeliveryPlanner;
use critsheet_core::AppConfig;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::{
    CacheGetParams, CacheSweepParams, CssOptimizeParams, CustomCssParams, cache, custom_css::custom_css_impl,
    optimize::optimize_impl,
};

/// The main MCP server handler for critsheet.
#[derive(Clone)]
pub struct CritsheetServer {
    tool_router: ToolRouter<Self>,
    config: Arc<AppConfig>,
    planner: DeliveryPlanner,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CritsheetServer {
    /// Create a new server handler over a shared planner.
    pub fn new(config: Arc<AppConfig>, planner: DeliveryPlanner) -> Self {
        Self { tool_router: Self::tool_router(), config, planner }
    }

    /// Optimize a stylesheet queue.
    ///
    /// Resolves, minifies and splits each stylesheet, then returns inline critical CSS
    /// and a content-addressed bundle for the rest.
    #[tool(
        description = "Optimize an ordered stylesheet queue. Returns inline critical CSS, a deferred bundle reference with preload markup, and a per-stylesheet report."
    )]
    async fn css_optimize(&self, params: Parameters<CssOptimizeParams>) -> Result<CallToolResult, McpError> {
        optimize_impl(&self.planner, &self.config.optimization, params.0).await
    }

    #[tool(description = "Read a cached stylesheet or bundle by its 64-character fingerprint.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(self.planner.store().as_ref(), params.0).await
    }

    #[tool(description = "Delete expired cache entries, or every entry when `all` is true. Returns the number deleted.")]
    async fn cache_sweep(&self, params: Parameters<CacheSweepParams>) -> Result<CallToolResult, McpError> {
        cache::sweep_impl(self.planner.store().as_ref(), params.0).await
    }

    #[tool(description = "Render the operator's custom CSS as a markup-free <style> block.")]
    async fn custom_css(&self, params: Parameters<CustomCssParams>) -> Result<CallToolResult, McpError> {
        custom_css_impl(&self.config.optimization, params.0)
    }
}

impl ServerHandler for CritsheetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-critsheet".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
