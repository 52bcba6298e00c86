//! Persistent Driver
//!
//! One file per key under a namespace directory. Writes go to a hidden
//! temporary sibling and are renamed into place so readers never see
//! partial content.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::StorageDriver;
use crate::cache::entry::epoch;
use crate::config::DriverKind;
use crate::error::{CacheError, Result};

/// Distinguishes concurrent temp files written by this process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Longest encoded name used as-is; leaves room for the temp-file affixes
/// under the common 255-byte NAME_MAX.
const MAX_FILE_NAME: usize = 200;

/// Readable prefix kept in front of the digest of an over-long name.
const HASHED_PREFIX: usize = 100;

// == Path Resolver ==
/// Maps a logical cache namespace to a physical directory.
pub trait PathResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, namespace: &str) -> PathBuf;
}

/// Places every namespace in a subdirectory of a fixed root.
#[derive(Debug, Clone)]
pub struct RootDirResolver {
    root: PathBuf,
}

impl RootDirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathResolver for RootDirResolver {
    fn resolve(&self, namespace: &str) -> PathBuf {
        self.root.join(file_name(namespace))
    }
}

// == Persistent Driver ==
/// File-backed store; entries survive process restarts.
#[derive(Debug, Clone)]
pub struct PersistentDriver {
    dir: PathBuf,
}

impl PersistentDriver {
    pub fn new(resolver: &dyn PathResolver, namespace: &str) -> Self {
        Self {
            dir: resolver.resolve(namespace),
        }
    }

    /// Directory holding this namespace's entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }

    async fn write_atomic(&self, key: &str, content: &str) -> Result<()> {
        let failure = |e: std::io::Error| CacheError::StoreFailure {
            key: key.to_string(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&self.dir).await.map_err(failure)?;

        let name = file_name(key);
        let path = self.dir.join(&name);
        let tmp = self.dir.join(tmp_name(&name));
        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(failure(e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(failure(e));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for PersistentDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Persistent
    }

    async fn get(&self, key: &str) -> Result<String> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::NotFound(key.to_string())),
            Err(e) => Err(CacheError::Internal(format!("Failed to read {}: {}", key, e))),
        }
    }

    async fn store(&self, key: &str, content: &str) -> bool {
        match self.write_atomic(key, content).await {
            Ok(()) => {
                debug!(key, bytes = content.len(), "Stored artifact on disk");
                true
            }
            Err(e) => {
                warn!(error = %e, "Persistent store failed");
                false
            }
        }
    }

    async fn last_modified(&self, key: &str) -> DateTime<Utc> {
        fs::metadata(self.path_for(key))
            .await
            .and_then(|meta| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| epoch())
    }

    /// Checks the file itself; a valid entry may carry an mtime of 0.
    async fn exists(&self, key: &str) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    async fn delete(&self, key: &str) -> bool {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to delete cached artifact");
                false
            }
        }
    }
}

// == Helpers ==
/// Encodes an arbitrary key as a single safe file name.
///
/// Bytes outside `[A-Za-z0-9_-]` (and `.` anywhere but the first position)
/// become `%XX`, so distinct keys always map to distinct names.
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, byte) in raw.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' || (byte == b'.' && i > 0);
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    if out.is_empty() {
        out.push('%');
    }
    out
}

/// File name for `raw`: the encoded form, or for over-long keys a prefix of
/// it plus `~` and the SHA-256 of the key. `~` never appears in encoded form.
fn file_name(raw: &str) -> String {
    let encoded = encode_segment(raw);
    if encoded.len() <= MAX_FILE_NAME {
        return encoded;
    }
    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    // Encoded names are ASCII, so any byte index is a char boundary
    format!("{}~{}", &encoded[..HASHED_PREFIX], digest)
}

/// Leading `.` keeps temp files out of the space of entry names.
fn tmp_name(name: &str) -> String {
    format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(root: &Path) -> PersistentDriver {
        PersistentDriver::new(&RootDirResolver::new(root), "cacheable_assets")
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("templates:home"), "templates%3Ahome");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment(".."), "%2E.");
        assert_eq!(encode_segment("bundle.min.css"), "bundle.min.css");
        assert_ne!(encode_segment("a%3Ab"), encode_segment("a:b"));
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());

        assert!(driver.store("cacheable_assets:bundle", ".a{}").await);
        assert_eq!(driver.get("cacheable_assets:bundle").await.unwrap(), ".a{}");
        assert!(driver.dir().starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());

        let result = driver.get("nonexistent").await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_survives_new_driver_instance() {
        let dir = tempfile::tempdir().unwrap();
        assert!(driver(dir.path()).store("k", "durable").await);

        // A fresh instance stands in for a restarted process
        assert_eq!(driver(dir.path()).get("k").await.unwrap(), "durable");
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());

        assert!(driver.store("k", "v1").await);
        assert!(driver.store("k", "v2").await);
        assert_eq!(driver.get("k").await.unwrap(), "v2");

        let names: Vec<_> = std::fs::read_dir(driver.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_last_modified() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());

        assert_eq!(driver.last_modified("k").await, epoch());
        assert!(!driver.exists("k").await);

        driver.store("k", "v").await;
        assert!(driver.last_modified("k").await > epoch());
        assert!(driver.exists("k").await);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());

        driver.store("k", "v").await;
        assert!(driver.delete("k").await);
        assert!(driver.delete("k").await);
        assert!(matches!(driver.get("k").await, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_failure_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the namespace directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();

        let driver = PersistentDriver::new(&RootDirResolver::new(&blocker), "ns");
        assert!(!driver.store("k", "v").await);
    }

    #[tokio::test]
    async fn test_long_keys_are_hashed_to_a_valid_name() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());
        let long_a = format!("assets:{}:{}", "/".repeat(180), "a".repeat(64));
        let long_b = format!("assets:{}:{}", "/".repeat(180), "b".repeat(64));

        assert!(file_name(&long_a).len() <= MAX_FILE_NAME + 1 + 64);
        assert_ne!(file_name(&long_a), file_name(&long_b));

        assert!(driver.store(&long_a, "a").await);
        assert!(driver.store(&long_b, "b").await);
        assert_eq!(driver.get(&long_a).await.unwrap(), "a");
        assert_eq!(driver.get(&long_b).await.unwrap(), "b");
        assert!(driver.delete(&long_a).await);
        assert!(!driver.exists(&long_a).await);
        assert!(driver.exists(&long_b).await);
    }

    #[test]
    fn test_temp_names_never_match_entry_names() {
        let name = file_name("k");
        let tmp = tmp_name(&name);
        assert!(tmp.starts_with('.'));

        // A key spelled like a temp file still encodes without the leading dot
        assert!(!file_name(&tmp).starts_with('.'));
        assert_ne!(file_name(&tmp), tmp);
    }

    #[tokio::test]
    async fn test_exists_with_epoch_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(dir.path());
        assert!(driver.store("k", "reproducible").await);

        std::fs::OpenOptions::new()
            .write(true)
            .open(driver.path_for("k"))
            .unwrap()
            .set_modified(std::time::SystemTime::UNIX_EPOCH)
            .unwrap();

        assert_eq!(driver.last_modified("k").await, epoch());
        assert!(driver.exists("k").await);
    }
}
