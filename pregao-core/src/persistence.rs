//! Key-value persistence used by the daily window cache.
//!
//! Values are opaque JSON strings. Stores never expire entries on their own.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::PregaoError;

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns `PregaoError::Storage` when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PregaoError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `PregaoError::Storage` when the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), PregaoError>;
}

/// Process-local store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PregaoError> {
        Ok(self.inner.lock().expect("mutex poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PregaoError> {
        self.inner
            .lock()
            .expect("mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole map is loaded on open and rewritten on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    /// Returns `PregaoError::Storage` if the file exists but cannot be read or
    /// does not hold a JSON object of strings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PregaoError> {
        let path = path.as_ref().to_path_buf();
        let map = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(PregaoError::storage)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(PregaoError::storage(e)),
        };
        Ok(Self {
            path,
            inner: Mutex::new(map),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, map: &BTreeMap<String, String>) -> Result<(), PregaoError> {
        let raw = serde_json::to_string_pretty(map).map_err(PregaoError::storage)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw).map_err(PregaoError::storage)?;
        std::fs::rename(&tmp, &self.path).map_err(PregaoError::storage)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PregaoError> {
        Ok(self.inner.lock().expect("mutex poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PregaoError> {
        let mut map = self.inner.lock().expect("mutex poisoned");
        let previous = map.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&map) {
            // Roll back so memory matches disk.
            match previous {
                Some(v) => map.insert(key.to_string(), v),
                None => map.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}
