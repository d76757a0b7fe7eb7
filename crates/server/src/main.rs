//! mcp-critsheet server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use critsheet_client::{DeliveryPlanner, FetchClient, FetchConfig};
use critsheet_core::{AppConfig, cache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod maintenance;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(site_url = %config.site_url, backend = ?config.cache_backend, "Starting mcp-critsheet server on stdio transport");

    let store = cache::open_configured(&config).await?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let planner = DeliveryPlanner::from_app(&config, store.clone(), fetcher)?;

    let sweeper = maintenance::spawn_sweeper(store, config.sweep_interval());

    let handler = handler::CritsheetServer::new(Arc::new(config), planner);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    sweeper.abort();

    Ok(())
}
