use std::collections::HashMap;

use pregao_types::{SnapshotCategory, SnapshotEntry, SnapshotRef};

/// In-memory best-known snapshots per instrument.
///
/// Writes go through [`crate::merge`], which enforces that a category never
/// regresses to an older source time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotStore {
    entries: HashMap<String, SnapshotEntry>,
}

impl SnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `instrument`, if any snapshot was ever adopted for it.
    #[must_use]
    pub fn get(&self, instrument: &str) -> Option<&SnapshotEntry> {
        self.entries.get(instrument)
    }

    /// Snapshot of one category for `instrument`.
    #[must_use]
    pub fn snapshot(&self, instrument: &str, category: SnapshotCategory) -> Option<&SnapshotRef> {
        self.entries.get(instrument).and_then(|e| e.get(category))
    }

    /// Number of instruments with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no instrument has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(instrument, entry)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn entry_mut(&mut self, instrument: &str) -> Option<&mut SnapshotEntry> {
        self.entries.get_mut(instrument)
    }

    pub(crate) fn insert(&mut self, instrument: String, entry: SnapshotEntry) {
        self.entries.insert(instrument, entry);
    }
}
