//! Live market payload delivered on every poll.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::snapshot::{AfterHoursRef, SnapshotEntry, SnapshotRef};

/// Intraday price series used for sparklines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Closing prices, oldest first.
    #[serde(default)]
    pub closes: Vec<f64>,
    /// Timestamps aligned with `closes`.
    #[serde(default)]
    pub timestamps: Vec<String>,
}

/// Realtime view of one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    /// Last traded price.
    #[serde(default)]
    pub current: Option<f64>,
    /// Percentage change against the previous close.
    #[serde(default)]
    pub variation_percent: Option<f64>,
    /// Official close, when the session has closed.
    #[serde(default)]
    pub at_close: Option<SnapshotRef>,
    /// After-hours quote, when available.
    #[serde(default)]
    pub after_hours: Option<AfterHoursRef>,
    /// Intraday series.
    #[serde(default)]
    pub series: Series,
    /// Data time reported by the backend for this quote.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One poll of the market-data endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPayload {
    /// Realtime quotes keyed by instrument (ADRs and commodities alike).
    #[serde(default)]
    pub quotes: BTreeMap<String, LiveQuote>,
    /// Closing/after-hours snapshots embedded by the backend.
    #[serde(default)]
    pub embedded_snapshots: BTreeMap<String, SnapshotEntry>,
    /// Time the backend produced the payload.
    #[serde(default)]
    pub timestamp: Option<String>,
}
