//! Snapshot records: live-embedded, stored and historical.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotCategory {
    /// Official closing snapshot.
    Closing,
    /// After-hours session snapshot.
    AfterHours,
}

impl SnapshotCategory {
    /// Both categories, in backfill request order.
    pub const ALL: [Self; 2] = [Self::Closing, Self::AfterHours];

    /// Wire name used by the history endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closing => "closing",
            Self::AfterHours => "after_hours",
        }
    }
}

impl fmt::Display for SnapshotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price + variation + source time record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// Price at snapshot time.
    #[serde(default)]
    pub price: Option<f64>,
    /// Percentage change against the reference price.
    #[serde(default, alias = "variation")]
    pub change_percent: Option<f64>,
    /// ISO-like source timestamp.
    #[serde(default)]
    pub time: Option<String>,
}

impl SnapshotRef {
    /// Convenience constructor for a fully populated snapshot.
    pub fn new(price: f64, change_percent: f64, time: impl Into<String>) -> Self {
        Self {
            price: Some(price),
            change_percent: Some(change_percent),
            time: Some(time.into()),
        }
    }
}

/// After-hours snapshot with an availability flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AfterHoursRef {
    /// The snapshot values.
    #[serde(flatten)]
    pub snapshot: SnapshotRef,
    /// Whether the provider reported an active after-hours quote.
    #[serde(default)]
    pub available: bool,
}

/// Best-known closing and after-hours snapshots for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Latest closing snapshot.
    #[serde(default)]
    pub closing: Option<SnapshotRef>,
    /// Latest after-hours snapshot.
    #[serde(default)]
    pub after_hours: Option<SnapshotRef>,
}

impl SnapshotEntry {
    /// Snapshot for the given category.
    #[must_use]
    pub const fn get(&self, category: SnapshotCategory) -> Option<&SnapshotRef> {
        match category {
            SnapshotCategory::Closing => self.closing.as_ref(),
            SnapshotCategory::AfterHours => self.after_hours.as_ref(),
        }
    }

    /// Mutable slot for the given category.
    pub const fn slot_mut(&mut self, category: SnapshotCategory) -> &mut Option<SnapshotRef> {
        match category {
            SnapshotCategory::Closing => &mut self.closing,
            SnapshotCategory::AfterHours => &mut self.after_hours,
        }
    }

    /// Entry holding a single category.
    #[must_use]
    pub fn with(category: SnapshotCategory, snapshot: SnapshotRef) -> Self {
        let mut entry = Self::default();
        *entry.slot_mut(category) = Some(snapshot);
        entry
    }
}

/// Request for the most recent history records of one (instrument, category).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Ticker to query.
    pub instrument: String,
    /// Snapshot category to query.
    pub category: SnapshotCategory,
    /// Maximum number of records; the engine always asks for 1.
    pub limit: u32,
}

impl HistoryRequest {
    /// Request for the single most recent record.
    pub fn latest(instrument: impl Into<String>, category: SnapshotCategory) -> Self {
        Self {
            instrument: instrument.into(),
            category,
            limit: 1,
        }
    }
}

/// A record returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    /// Ticker the record belongs to.
    pub instrument: String,
    /// Category of the record.
    pub category: SnapshotCategory,
    /// Price at snapshot time.
    pub price: Option<f64>,
    /// Percentage change at snapshot time.
    pub variation_percent: Option<f64>,
    /// Source timestamp of the record.
    pub source_time: Option<String>,
}

impl HistoricalSnapshot {
    /// View this record as a store-shaped snapshot.
    #[must_use]
    pub fn to_snapshot_ref(&self) -> SnapshotRef {
        SnapshotRef {
            price: self.price,
            change_percent: self.variation_percent,
            time: self.source_time.clone(),
        }
    }
}
