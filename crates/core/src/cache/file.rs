//! File-backed cache store.
//!
//! Layout: `<root>/<fingerprint>.css`. The file's modification time is the
//! entry's creation time. Writes land in a temporary file inside `root` and
//! are renamed into place, so readers never observe a partial entry.

use std::fmt;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{CacheEntry, CacheStore, Clock, Fingerprint, is_expired, is_fresh, system_clock};
use crate::Error;

/// Cache store keeping one file per fingerprint.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    ttl: Duration,
    clock: Clock,
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore").field("root", &self.root).field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl FileStore {
    /// Open (and create if needed) a cache directory.
    pub fn open(root: impl Into<PathBuf>, ttl: Duration) -> Result<Self, Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::CacheWrite(format!("failed to create cache dir {}: {e}", root.display())))?;
        Ok(Self { root, ttl, clock: system_clock() })
    }

    /// Replace the time source used for freshness checks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the entry for `key` lives.
    pub fn path_for(&self, key: &Fingerprint) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Visit every cache file under the root, deleting those `doomed` selects.
    ///
    /// Only `<fingerprint>.css` entries and leftover write temporaries are
    /// considered; anything else in the directory is left alone.
    async fn delete_where(&self, doomed: impl Fn(&Path, DateTime<Utc>) -> bool) -> Result<u64, Error> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::CacheRead(format!("{}: {e}", self.root.display()))),
        };

        let mut deleted = 0u64;
        while let Some(entry) =
            dir.next_entry().await.map_err(|e| Error::CacheRead(format!("{}: {e}", self.root.display())))?
        {
            let path = entry.path();
            if !is_cache_file(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot stat cache file; skipping");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cache file has no mtime; skipping");
                    continue;
                }
            };
            if !doomed(&path, modified) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to delete cache file"),
            }
        }

        Ok(deleted)
    }
}

const TEMP_PREFIX: &str = ".critsheet-";
const TEMP_SUFFIX: &str = ".tmp";

/// `<64 hex>.css` or one of our write temporaries.
fn is_cache_file(name: &str) -> bool {
    if name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX) {
        return true;
    }
    name.strip_suffix(".css").is_some_and(|stem| Fingerprint::parse(stem).is_ok())
}

/// Write `content` to a temporary file in `root` and rename it onto `path`.
fn write_atomic(root: &Path, path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = tempfile::Builder::new().prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX).tempfile_in(root)?;
    file.write_all(content)?;
    file.flush()?;

    match file.persist(path) {
        Ok(_) => Ok(()),
        // Another writer persisted the same key concurrently; its bytes are equivalent.
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err.error),
    }
}

#[async_trait::async_trait]
impl CacheStore for FileStore {
    async fn get_fresh(&self, key: &Fingerprint, ttl: Duration) -> Result<Option<CacheEntry>, Error> {
        let path = self.path_for(key);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::CacheRead(format!("{}: {e}", path.display()))),
        };
        if !metadata.is_file() {
            return Ok(None);
        }

        let created_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| Error::CacheRead(format!("{}: {e}", path.display())))?;
        if !is_fresh(created_at, (self.clock)(), ttl) {
            tracing::debug!(key = %key, "cache entry expired");
            return Ok(None);
        }

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            // Swept between stat and read.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::CacheRead(format!("{}: {e}", path.display()))),
        };

        Ok(Some(CacheEntry { key: key.clone(), content, created_at }))
    }

    async fn set(&self, key: &Fingerprint, content: &[u8]) -> Result<(), Error> {
        let root = self.root.clone();
        let path = self.path_for(key);
        let content = content.to_vec();

        tokio::task::spawn_blocking(move || write_atomic(&root, &path, &content))
            .await
            .map_err(|e| Error::CacheWrite(format!("write task failed: {e}")))?
            .map_err(|e| Error::CacheWrite(format!("{key}: {e}")))
    }

    async fn remove(&self, key: &Fingerprint) -> Result<bool, Error> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::CacheWrite(format!("{key}: {e}"))),
        }
    }

    async fn sweep(&self) -> Result<u64, Error> {
        let now = (self.clock)();
        let ttl = self.ttl;
        let deleted = self.delete_where(|_, modified| is_expired(modified, now, ttl)).await?;
        tracing::debug!(root = %self.root.display(), deleted, "swept file cache");
        Ok(deleted)
    }

    async fn clear(&self) -> Result<u64, Error> {
        self.delete_where(|_, _| true).await
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn offset_clock(base: DateTime<Utc>, offset_secs: i64) -> Clock {
        Arc::new(move || base + chrono::Duration::seconds(offset_secs))
    }

    fn mtime(path: &Path) -> DateTime<Utc> {
        DateTime::<Utc>::from(std::fs::metadata(path).unwrap().modified().unwrap())
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        let key = Fingerprint::for_content(b"body{margin:0;}");

        store.set(&key, b"body{margin:0;}").await.unwrap();

        let entry = store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.content, b"body{margin:0;}");
        assert!(dir.path().join(key.file_name()).is_file());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        assert!(store.get(&Fingerprint::for_content(b"none")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        let key = Fingerprint::for_content(b"k");

        store.set(&key, b"one").await.unwrap();
        store.set(&key, b"two").await.unwrap();

        assert_eq!(store.get(&key).await.unwrap().unwrap().content, b"two");
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let dir = TempDir::new().unwrap();
        let ttl = Duration::from_secs(3600);
        let store = FileStore::open(dir.path(), ttl).unwrap();
        let key = Fingerprint::for_content(b"k");
        store.set(&key, b"x").await.unwrap();
        let written = mtime(&store.path_for(&key));

        let just_before = store.clone().with_clock(offset_clock(written, 3599));
        assert!(just_before.get(&key).await.unwrap().is_some());

        let at_ttl = store.clone().with_clock(offset_clock(written, 3600));
        assert!(at_ttl.get(&key).await.unwrap().is_none());
        // Expired entries are not removed by reads.
        assert!(store.path_for(&key).is_file());
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        let old = Fingerprint::for_content(b"old");
        let fresh = Fingerprint::for_content(b"fresh");
        store.set(&old, b"old").await.unwrap();
        store.set(&fresh, b"fresh").await.unwrap();

        let old_file = std::fs::File::options().write(true).open(store.path_for(&old)).unwrap();
        old_file.set_modified(std::time::SystemTime::now() - Duration::from_secs(600)).unwrap();

        let deleted = store.sweep().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(!store.path_for(&old).exists());
        assert!(store.path_for(&fresh).exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_root() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("cache"), Duration::from_secs(60)).unwrap();
        std::fs::remove_dir(store.root()).unwrap();
        assert_eq!(store.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        let a = Fingerprint::for_content(b"a");
        let b = Fingerprint::for_content(b"b");
        store.set(&a, b"a").await.unwrap();
        store.set(&b, b"b").await.unwrap();

        assert!(store.remove(&a).await.unwrap());
        assert!(!store.remove(&a).await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.get(&b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_leaves_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        store.set(&Fingerprint::for_content(b"a"), b"a").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        std::fs::write(dir.path().join("theme.css"), "body{}").unwrap();
        std::fs::write(dir.path().join(".critsheet-abc.tmp"), "partial").unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(dir.path().join("notes.txt").is_file());
        assert!(dir.path().join("theme.css").is_file());
    }

    #[tokio::test]
    async fn test_sweep_tolerates_entries_removed_underneath() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        store.set(&Fingerprint::for_content(b"a"), b"a").await.unwrap();
        store.set(&Fingerprint::for_content(b"b"), b"b").await.unwrap();

        // Another sweeper empties the directory while this one is iterating.
        let root = dir.path().to_path_buf();
        let deleted = store
            .delete_where(|_, _| {
                for entry in std::fs::read_dir(&root).unwrap() {
                    let _ = std::fs::remove_file(entry.unwrap().path());
                }
                true
            })
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_is_cache_file() {
        let key = Fingerprint::for_content(b"a");
        assert!(is_cache_file(&key.file_name()));
        assert!(is_cache_file(".critsheet-x1y2.tmp"));
        assert!(!is_cache_file("style.css"));
        assert!(!is_cache_file(key.as_str()));
        assert!(!is_cache_file(&format!("{}.CSS", key.as_str().to_uppercase())));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), Duration::from_secs(60)).unwrap();
        store.set(&Fingerprint::for_content(b"a"), b"a").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".css"));
    }
}
