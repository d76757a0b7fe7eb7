//! Background cache maintenance.

use std::sync::Arc;
use std::time::Duration;

use critsheet_core::CacheStore;
use tokio::task::JoinHandle;

/// Sweep expired entries from `store` every `every`, starting one period
/// after spawn.
pub fn spawn_sweeper(store: Arc<dyn CacheStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            match store.sweep().await {
                Ok(deleted) => tracing::info!(deleted, "swept expired cache entries"),
                Err(e) => tracing::warn!(error = %e, "cache sweep failed"),
            }
        }
    })
}
