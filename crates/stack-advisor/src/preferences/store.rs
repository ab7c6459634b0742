//! Preference persistence
//!
//! `PreferenceStore` loads and saves the single preference record through
//! an injected key/value backend. Backend failures never reach callers:
//! reads fall back to the empty record and a failed write switches the
//! store to memory-only operation for the rest of the session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::preferences::types::PreferenceRecord;

/// Maximum length for storage keys
const MAX_KEY_LEN: usize = 128;

/// Errors raised by key/value backends
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key is empty, too long, or contains characters unsafe for a file name
    #[error("Invalid storage key '{0}': allowed are a-z, A-Z, 0-9, _, - (max {MAX_KEY_LEN})")]
    InvalidKey(String),

    /// Reading the value failed
    #[error("Failed to read '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Writing the value failed
    #[error("Failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// Durable string key/value persistence supplied by the host
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// File-backed key/value store: one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let write_err = |e: std::io::Error| StoreError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        // Write then rename so a crash never leaves a half-written record
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp_path, value).map_err(write_err)?;
        std::fs::rename(&tmp_path, &path).map_err(write_err)?;
        Ok(())
    }
}

/// In-process key/value store
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|e| StoreError::Read {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|e| StoreError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and saves the preference record under a fixed key
pub struct PreferenceStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    degraded: bool,
}

impl PreferenceStore {
    /// Create a store that persists under `key` in `backend`
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            degraded: false,
        }
    }

    /// Load the persisted record
    ///
    /// Returns the default empty record when nothing is stored or the
    /// stored value does not parse. A failing read also switches the store
    /// to memory-only so an unreadable record is never overwritten.
    pub fn load(&mut self) -> PreferenceRecord {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored preferences under '{}'", self.key);
                return PreferenceRecord::default();
            }
            Err(e) => {
                warn!("Preference read failed, continuing in memory only: {e}");
                self.degraded = true;
                return PreferenceRecord::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Stored preferences under '{}' are malformed, using defaults: {e}", self.key);
                PreferenceRecord::default()
            }
        }
    }

    /// Persist the full record, replacing the previous value
    ///
    /// A failed write is logged and turns every later save into a no-op.
    pub fn save(&mut self, record: &PreferenceRecord) {
        if self.degraded {
            debug!("Preference store is memory-only, skipping save");
            return;
        }

        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize preferences: {e}");
                return;
            }
        };

        match self.backend.set(&self.key, &raw) {
            Ok(()) => debug!("Saved preferences ({} bytes)", raw.len()),
            Err(e) => {
                warn!("Preference write failed, continuing in memory only: {e}");
                self.degraded = true;
            }
        }
    }

    /// True once a backend failure has switched the store to memory-only
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Key the record is stored under
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("key", &self.key)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingKvStore;

    fn sample_record() -> PreferenceRecord {
        PreferenceRecord {
            preferred_languages: ["Python", "Go"].into_iter().collect(),
            previous_tools: ["Django"].into_iter().collect(),
            last_project_type: Some("blog".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("techStackPreferences").is_ok());
        assert!(validate_key("prefs_v2-backup").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"a".repeat(129)).is_err());
        assert!(validate_key(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        assert_eq!(store.get("absent").unwrap(), None);
    }

    #[test]
    fn test_file_store_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path().join("nested"));

        store.set("prefs", "{\"a\":1}").unwrap();
        assert_eq!(store.get("prefs").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("nested").join("prefs.json").exists());
        assert!(!dir.path().join("nested").join("prefs.json.tmp").exists());

        store.set("prefs", "second").unwrap();
        assert_eq!(store.get("prefs").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        assert!(matches!(
            store.set("../outside", "x"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_load_without_stored_value_is_default() {
        let mut store = PreferenceStore::new(Box::new(MemoryKvStore::new()), "prefs");
        assert_eq!(store.load(), PreferenceRecord::default());
        assert!(!store.is_degraded());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample_record();

        let mut store = PreferenceStore::new(Box::new(FileKvStore::new(dir.path())), "prefs");
        store.save(&record);

        let mut reopened = PreferenceStore::new(Box::new(FileKvStore::new(dir.path())), "prefs");
        assert_eq!(reopened.load(), record);
    }

    #[test]
    fn test_malformed_value_falls_back_to_default() {
        let backend = MemoryKvStore::new();
        backend.set("prefs", "{not json").unwrap();

        let mut store = PreferenceStore::new(Box::new(backend), "prefs");
        assert_eq!(store.load(), PreferenceRecord::default());
        // A corrupt record may be overwritten
        assert!(!store.is_degraded());
    }

    #[test]
    fn test_failed_read_degrades_store() {
        let backend = Arc::new(FailingKvStore::new());
        let mut store = PreferenceStore::new(Box::new(backend.clone()), "prefs");

        assert_eq!(store.load(), PreferenceRecord::default());
        assert!(store.is_degraded());

        store.save(&sample_record());
        assert_eq!(backend.write_attempts(), 0);
    }

    #[test]
    fn test_failed_write_degrades_store() {
        let backend = Arc::new(FailingKvStore::writes_only());
        let mut store = PreferenceStore::new(Box::new(backend.clone()), "prefs");

        assert_eq!(store.load(), PreferenceRecord::default());
        assert!(!store.is_degraded());

        store.save(&sample_record());
        assert!(store.is_degraded());
        store.save(&sample_record());
        assert_eq!(backend.write_attempts(), 1);
    }
}
