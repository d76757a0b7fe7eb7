//! Content-addressed, TTL-bounded cache for transformed stylesheets.
//!
//! Entries are keyed by a [`Fingerprint`] and hold the final transformed
//! bytes for that key. Freshness is `now - created_at < ttl`; expired entries
//! read as a miss and stay on disk until [`CacheStore::sweep`] runs.
//!
//! Backends:
//!
//! - [`FileStore`]: one `<fingerprint>.css` file per entry, mtime as freshness
//! - [`MemoryStore`]: process-local map
//! - [`SqliteStore`]: keyed store with WAL mode and schema migrations
//!
//! Writers computing the same key produce identical bytes, so no backend
//! locks across `set` calls.

pub mod connection;
pub mod entries;
pub mod file;
pub mod fingerprint;
pub mod memory;
pub mod migrations;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

pub use crate::Error;

pub use connection::SqliteStore;
pub use file::FileStore;
pub use fingerprint::Fingerprint;
pub use memory::MemoryStore;

/// Time source used for freshness checks.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A fresh cache entry as returned by [`CacheStore::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: Fingerprint,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheRead` when the stored bytes are not valid UTF-8.
    pub fn into_text(self) -> Result<String, Error> {
        String::from_utf8(self.content).map_err(|e| Error::CacheRead(format!("{}: {e}", self.key)))
    }
}

/// Backing store for cached stylesheets and bundles.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry younger than `ttl`; older or absent entries are `None`.
    ///
    /// Lets a pass apply its own TTL while sweeps keep using [`CacheStore::ttl`].
    async fn get_fresh(&self, key: &Fingerprint, ttl: Duration) -> Result<Option<CacheEntry>, Error>;

    /// Fetch an entry fresh under the store's own TTL.
    async fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, Error> {
        self.get_fresh(key, self.ttl()).await
    }

    /// Store `content` under `key`, replacing whatever was there.
    async fn set(&self, key: &Fingerprint, content: &[u8]) -> Result<(), Error>;

    /// Drop one entry. Returns whether anything was removed.
    async fn remove(&self, key: &Fingerprint) -> Result<bool, Error>;

    /// Delete every entry older than the TTL. Returns the number deleted.
    async fn sweep(&self) -> Result<u64, Error>;

    /// Delete every entry regardless of age. Returns the number deleted.
    async fn clear(&self) -> Result<u64, Error>;

    /// Maximum entry age.
    fn ttl(&self) -> Duration;
}

/// Open the backend selected by `config.cache_backend`.
pub async fn open_configured(config: &crate::AppConfig) -> Result<Arc<dyn CacheStore>, Error> {
    let ttl = config.optimization.cache_ttl();
    let store: Arc<dyn CacheStore> = match config.cache_backend {
        crate::CacheBackend::File => Arc::new(FileStore::open(&config.cache_dir, ttl)?),
        crate::CacheBackend::Sqlite => Arc::new(SqliteStore::open(&config.db_path, ttl).await?),
        crate::CacheBackend::Memory => Arc::new(MemoryStore::new(ttl)),
    };
    tracing::info!(backend = ?config.cache_backend, ttl_secs = ttl.as_secs(), "opened stylesheet cache");
    Ok(store)
}

/// Hit condition shared by every backend: `now - created_at < ttl`.
///
/// Timestamps in the future count as age zero.
pub(crate) fn is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    age(created_at, now) < ttl
}

/// Sweep condition: age strictly exceeds the TTL.
pub(crate) fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    age(created_at, now) > ttl
}

fn age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(created_at).to_std().unwrap_or(Duration::ZERO)
}
