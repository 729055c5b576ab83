//! Report envelopes produced by the engine.

use serde::{Deserialize, Serialize};

use crate::aggregate::WidgetSet;
use crate::error::PregaoError;

/// Summary of one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Number of (instrument, category) requests enqueued.
    pub requested: usize,
    /// Responses that changed the snapshot store.
    pub applied: usize,
    /// Successful responses that carried no record or were not newer.
    pub empty: usize,
    /// Requests that failed after all retries.
    pub failed: usize,
}

/// Counts of categories adopted by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Instruments seen for the first time and adopted wholesale.
    pub inserted: usize,
    /// Closing snapshots replaced by a fresher one.
    pub closing_updated: usize,
    /// After-hours snapshots replaced by a fresher one.
    pub after_hours_updated: usize,
}

impl MergeOutcome {
    /// True when the store changed.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted + self.closing_updated + self.after_hours_updated > 0
    }

    /// Accumulate another outcome into this one.
    pub const fn absorb(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.closing_updated += other.closing_updated;
        self.after_hours_updated += other.after_hours_updated;
    }
}

/// Status indicator derived from a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshStatus {
    /// The payload was fetched and applied.
    Success,
    /// The backend answered with a payload that could not be used.
    InvalidPayload,
    /// The payload fetch failed.
    ConnectionError,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Indicator for the dashboard.
    pub status: RefreshStatus,
    /// Wall time the cycle took, in milliseconds.
    pub duration_ms: u64,
    /// Backfill summary when this cycle ran the backfill.
    pub ingestion: Option<IngestionReport>,
    /// Widgets computed from the fetched payload.
    pub widgets: Option<WidgetSet>,
    /// Non-fatal issues encountered during the cycle.
    pub warnings: Vec<PregaoError>,
}
