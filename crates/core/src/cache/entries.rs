//! Entry operations for the keyed store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::SqliteStore;
use super::{CacheEntry, CacheStore, Fingerprint, is_fresh};
use crate::Error;

#[async_trait::async_trait]
impl CacheStore for SqliteStore {
    async fn get_fresh(&self, key: &Fingerprint, ttl: Duration) -> Result<Option<CacheEntry>, Error> {
        let lookup = key.as_str().to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(Vec<u8>, i64)>, Error> {
                let mut stmt = conn.prepare("SELECT content, created_at_ms FROM css_cache WHERE key = ?1")?;

                let result = stmt.query_row(params![lookup], |row| Ok((row.get(0)?, row.get(1)?)));

                match result {
                    Ok(found) => Ok(Some(found)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((content, created_at_ms)) = row else {
            return Ok(None);
        };
        let created_at = DateTime::<Utc>::from_timestamp_millis(created_at_ms)
            .ok_or_else(|| Error::CacheRead(format!("{key}: bad timestamp {created_at_ms}")))?;

        if !is_fresh(created_at, (self.clock)(), ttl) {
            return Ok(None);
        }

        Ok(Some(CacheEntry { key: key.clone(), content, created_at }))
    }

    /// Uses UPSERT semantics: inserts if the key doesn't exist,
    /// replaces content and timestamp if it does.
    async fn set(&self, key: &Fingerprint, content: &[u8]) -> Result<(), Error> {
        let key = key.as_str().to_string();
        let content = content.to_vec();
        let created_at_ms = (self.clock)().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO css_cache (key, content, created_at_ms) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        content = excluded.content,
                        created_at_ms = excluded.created_at_ms",
                    params![key, content, created_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, key: &Fingerprint) -> Result<bool, Error> {
        let key = key.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM css_cache WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn sweep(&self) -> Result<u64, Error> {
        let cutoff = cutoff_ms((self.clock)(), self.ttl);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM css_cache WHERE created_at_ms < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn clear(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM css_cache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Entries created before this instant have outlived the TTL.
fn cutoff_ms(now: DateTime<Utc>, ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.timestamp_millis().saturating_sub(ttl_ms)
}
