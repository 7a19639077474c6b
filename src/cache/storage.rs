//! Storage Module
//!
//! The persistent key-value medium behind the response cache. Modelled on
//! browser storage: string keys, string records, an optional byte quota.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// A string-to-string medium that may outlive the process.
pub trait Storage: Send + Sync {
    /// Returns the record stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous record.
    ///
    /// On error the medium is left unchanged.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes the record under `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<()>;

    /// All keys currently held, in sorted order.
    fn keys(&self) -> Vec<String>;
}

// == Quota Accounting ==
fn record_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Checks a prospective write against the quota.
fn check_quota(
    items: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<()> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let used: usize = items
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| record_size(k, v))
        .sum();
    let needed = used + record_size(key, value);

    if needed > quota {
        return Err(CacheError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

// == Memory Storage ==
/// In-process medium. Contents are lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Creates an empty medium without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty medium limited to `quota_bytes` of keys plus records.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no records are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        check_quota(&self.items, self.quota_bytes, key, value)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}

// == File Storage ==
/// Medium persisted as a single JSON object on disk.
///
/// Nothing is held in memory: every read loads the file and every mutation
/// re-reads it before writing, so several handles on one path see each
/// other's writes and removals. Writes go through a temp file and rename, so
/// a crash leaves either the old or the new document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    /// Opens (or prepares to create) the storage file at `path`.
    ///
    /// A file that cannot be parsed is logged and treated as empty; it is
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: Option<usize>) -> Result<Self> {
        let storage = Self {
            path: path.into(),
            quota_bytes,
        };

        let records = storage.load()?.len();
        debug!(path = %storage.path.display(), records, "Opened storage file");

        Ok(storage)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current document from disk.
    fn load(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Storage file is corrupted, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Writes `items` to disk via a temp file.
    fn flush(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(items)?;

        let temp_path = self.path.with_extension(format!("{}.tmp", std::process::id()));
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let mut items = self.load()?;
        check_quota(&items, self.quota_bytes, key, value)?;

        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let mut items = self.load()?;
        if items.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&items)
    }

    fn keys(&self) -> Vec<String> {
        match self.load() {
            Ok(items) => items.into_keys().collect(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Could not read storage file");
                Vec::new()
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_set_get_remove() {
        let mut storage = MemoryStorage::new();

        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), Some("1".to_string()));

        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);

        // Missing keys are fine to remove
        storage.remove_item("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_keys_sorted() {
        let mut storage = MemoryStorage::new();
        storage.set_item("b", "2").unwrap();
        storage.set_item("a", "1").unwrap();

        assert_eq!(storage.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_quota_rejects_and_leaves_medium_unchanged() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set_item("k1", "abc").unwrap(); // 5 bytes

        let result = storage.set_item("k2", "abcdef"); // would reach 13
        assert!(matches!(
            result,
            Err(CacheError::QuotaExceeded { needed: 13, quota: 10 })
        ));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get_item("k1").unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_quota_counts_overwrite_once() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set_item("k1", "abcdefgh").unwrap(); // 10 bytes, at quota

        // Replacing the same key only counts the new record
        storage.set_item("k1", "xyz").unwrap();
        assert_eq!(storage.get_item("k1").unwrap(), Some("xyz".to_string()));
    }

    #[test]
    fn test_file_storage_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("storage.json");

        {
            let mut storage = FileStorage::open(&path, None).unwrap();
            storage.set_item("cache:GET:/a", "{}").unwrap();
            storage.set_item("accessToken", "secret").unwrap();
            storage.remove_item("accessToken").unwrap();
        }

        let storage = FileStorage::open(&path, None).unwrap();
        assert_eq!(storage.keys(), vec!["cache:GET:/a".to_string()]);
        assert_eq!(storage.get_item("cache:GET:/a").unwrap(), Some("{}".to_string()));
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_storage_corrupted_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let mut storage = FileStorage::open(&path, None).unwrap();
        assert!(storage.keys().is_empty());

        storage.set_item("k", "v").unwrap();
        let reopened = FileStorage::open(&path, None).unwrap();
        assert_eq!(reopened.get_item("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_file_storage_quota_does_not_touch_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        let mut storage = FileStorage::open(&path, Some(4)).unwrap();
        assert!(storage.set_item("key", "value").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_file_storage_handles_share_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        let mut first = FileStorage::open(&path, None).unwrap();
        let mut second = FileStorage::open(&path, None).unwrap();

        // Writes from both handles survive
        first.set_item("cache:GET:/k1", "1").unwrap();
        second.set_item("cache:GET:/k2", "2").unwrap();
        assert_eq!(
            first.keys(),
            vec!["cache:GET:/k1".to_string(), "cache:GET:/k2".to_string()]
        );

        // A removal through one handle is seen by the other and not undone
        first.remove_item("cache:GET:/k2").unwrap();
        assert_eq!(second.get_item("cache:GET:/k2").unwrap(), None);
        second.set_item("cache:GET:/k3", "3").unwrap();

        let reopened = FileStorage::open(&path, None).unwrap();
        assert_eq!(
            reopened.keys(),
            vec!["cache:GET:/k1".to_string(), "cache:GET:/k3".to_string()]
        );
    }
}
