//! In-process cache store.
//!
//! Uses a HashMap behind a tokio RwLock. Sweeps take the write lock only
//! for the retain pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::{CacheEntry, CacheStore, Clock, Fingerprint, is_expired, is_fresh, system_clock};
use crate::Error;

/// Process-local cache store.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<Fingerprint, CacheEntry>>>,
    ttl: Duration,
    clock: Clock,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), ttl, clock: system_clock() }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn get_fresh(&self, key: &Fingerprint, ttl: Duration) -> Result<Option<CacheEntry>, Error> {
        let entries = self.entries.read().await;
        let now = (self.clock)();
        Ok(entries.get(key).filter(|entry| is_fresh(entry.created_at, now, ttl)).cloned())
    }

    async fn set(&self, key: &Fingerprint, content: &[u8]) -> Result<(), Error> {
        let entry = CacheEntry { key: key.clone(), content: content.to_vec(), created_at: (self.clock)() };
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &Fingerprint) -> Result<bool, Error> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn sweep(&self) -> Result<u64, Error> {
        let now = (self.clock)();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !is_expired(entry.created_at, now, self.ttl));
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let count = entries.len() as u64;
        entries.clear();
        Ok(count)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
