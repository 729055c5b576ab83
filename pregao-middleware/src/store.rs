//! Size-bounded key-value store with an optional durable backing store.

use std::sync::Arc;

use moka::sync::Cache;
use pregao_core::{KeyValueStore, PregaoError};

/// Key-value store that keeps at most `capacity` entries in memory.
///
/// Without a backing store, evicted entries are gone. With one, reads fall
/// through to it on a miss and writes go to it first, so the bound only limits
/// the hot set.
pub struct BoundedStore {
    cache: Cache<String, String>,
    backing: Option<Arc<dyn KeyValueStore>>,
}

impl BoundedStore {
    /// In-memory store holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity),
            backing: None,
        }
    }

    /// Put a size-bounded cache in front of `backing`.
    #[must_use]
    pub fn with_backing(capacity: u64, backing: Arc<dyn KeyValueStore>) -> Self {
        Self {
            cache: Cache::new(capacity),
            backing: Some(backing),
        }
    }

    /// Approximate number of cached entries.
    #[must_use]
    pub fn cached_len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl KeyValueStore for BoundedStore {
    fn get(&self, key: &str) -> Result<Option<String>, PregaoError> {
        if let Some(v) = self.cache.get(key) {
            return Ok(Some(v));
        }
        let Some(backing) = &self.backing else {
            return Ok(None);
        };
        let found = backing.get(key)?;
        if let Some(v) = &found {
            self.cache.insert(key.to_string(), v.clone());
        }
        Ok(found)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PregaoError> {
        if let Some(backing) = &self.backing {
            backing.set(key, value)?;
        }
        self.cache.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
