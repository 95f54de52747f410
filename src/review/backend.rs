//! Raw key/value persistence backends
//!
//! Review states and the chosen direction are stored as JSON strings under
//! namespaced keys. Any backend supporting point lookup, last-writer-wins
//! writes and prefix listing can hold them.
//!
//! `FileBackend` directory layout:
//! ```text
//! {data_dir}/
//! └── {url-encoded key}.json   # One document per key
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::errors::{StorageError, StorageResult};

#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`
    async fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn write(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// List all keys starting with `prefix`, sorted
    async fn keys(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// In-process backend.
///
/// Supports an optional byte quota and an availability switch so degraded
/// persistence can be reproduced without a real device.
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    available: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: None,
            available: AtomicBool::new(true),
        }
    }

    /// Limit the total size of keys plus values
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory backend is offline".to_string()))
        }
    }

    fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_available()?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.quota_bytes {
            let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
            let needed = Self::used_bytes(&entries) - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{} bytes needed, {} allowed",
                    needed, quota
                )));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_available()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.check_available()?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Directory-backed store: one JSON document per key
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Create the storage directory if needed
    pub async fn init(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }

    fn key_from_path(path: &Path) -> Option<String> {
        if path.extension().map_or(true, |ext| ext != "json") {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        urlencoding::decode(stem).ok().map(|k| k.into_owned())
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let bytes = match tokio::fs::read(self.key_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A document that is not text is corrupted, not a backend failure
        match String::from_utf8(bytes) {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                log::warn!("Ignoring corrupted document for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        // Write to a sibling temp file and rename so readers never see a
        // partially written document.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp_path, value).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(key) = Self::key_from_path(&entry.path()) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_prefix_listing() {
        let backend = MemoryBackend::new();
        backend.write("bgde:review_a_a-b", "1").await.unwrap();
        backend.write("bgde:review_b_b-a", "2").await.unwrap();
        backend.write("bgde:language-direction", "bg-de").await.unwrap();
        backend.write("other:review_c_a-b", "3").await.unwrap();

        let keys = backend.keys("bgde:review_").await.unwrap();
        assert_eq!(keys, vec!["bgde:review_a_a-b", "bgde:review_b_b-a"]);
    }

    #[tokio::test]
    async fn test_memory_quota() {
        let backend = MemoryBackend::with_quota(20);
        backend.write("key", "0123456789").await.unwrap();
        // Replacing a value only counts the difference
        backend.write("key", "9876543210").await.unwrap();

        let err = backend.write("other", "0123456789").await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded(_)));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_unavailable() {
        let backend = MemoryBackend::new();
        backend.set_available(false);
        let err = backend.read("key").await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert!(err.is_retryable());

        backend.set_available(true);
        assert_eq!(backend.read("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_round_trip_with_special_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("store"));
        backend.init().await.unwrap();

        let key = "bgde:review_straße/1_a-b";
        backend.write(key, "{\"x\":1}").await.unwrap();

        assert_eq!(backend.read(key).await.unwrap().as_deref(), Some("{\"x\":1}"));
        assert_eq!(backend.keys("bgde:").await.unwrap(), vec![key.to_string()]);

        backend.remove(key).await.unwrap();
        backend.remove(key).await.unwrap();
        assert_eq!(backend.read(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_non_text_document_reads_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().to_path_buf());
        backend.init().await.unwrap();

        let key = "bgde:review_bad_a-b";
        std::fs::write(backend.key_path(key), [0xff, 0xfe, 0x00, 0x7b]).unwrap();
        backend.write("bgde:review_good_a-b", "{}").await.unwrap();

        assert_eq!(backend.read(key).await.unwrap(), None);
        assert_eq!(backend.keys("bgde:").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_file_keys_on_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("missing"));
        assert!(backend.keys("").await.unwrap().is_empty());
    }
}
