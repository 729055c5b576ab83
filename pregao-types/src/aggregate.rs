//! Aggregate results and their provenance.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sums of positive and negative variations over an instrument set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTotals {
    /// Sum of strictly positive variations.
    #[serde(alias = "pos")]
    pub positive_sum: f64,
    /// Sum of strictly negative variations.
    #[serde(alias = "neg")]
    pub negative_sum: f64,
    /// `positive_sum + negative_sum`.
    pub total: f64,
}

impl AggregateTotals {
    /// Fold one variation into the totals.
    pub fn add(&mut self, value: f64) {
        if value > 0.0 {
            self.positive_sum += value;
        } else if value < 0.0 {
            self.negative_sum += value;
        }
        self.total = self.positive_sum + self.negative_sum;
    }
}

/// The four aggregates exposed to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregateKind {
    /// Live variation of the tracked set; never cached.
    Current,
    /// Official close of the tracked set, gated by the local exchange clock.
    CloseOfDay,
    /// After-hours session of the tracked set, gated by the foreign exchange clock.
    AfterHours,
    /// Live variation of the commodity set; never cached.
    Commodities,
}

impl AggregateKind {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::CloseOfDay => "close-of-day",
            Self::AfterHours => "after-hours",
            Self::Commodities => "commodities",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate kinds that go through the daily window cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKind {
    /// See [`AggregateKind::CloseOfDay`].
    CloseOfDay,
    /// See [`AggregateKind::AfterHours`].
    AfterHours,
}

impl CacheKind {
    /// Key segment used in persisted cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CloseOfDay => "close-of-day",
            Self::AfterHours => "after-hours",
        }
    }
}

impl From<CacheKind> for AggregateKind {
    fn from(kind: CacheKind) -> Self {
        match kind {
            CacheKind::CloseOfDay => Self::CloseOfDay,
            CacheKind::AfterHours => Self::AfterHours,
        }
    }
}

/// Where a served aggregate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Computed from the current payload and snapshot store.
    Realtime,
    /// Read from today's persisted entry.
    CachedToday,
    /// Read from yesterday's persisted entry.
    CachedYesterday,
    /// Nothing to serve.
    NoData,
}

/// Record persisted per (kind, day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCacheEntry {
    /// Totals at the time of the write.
    pub totals: AggregateTotals,
    /// Resolved data timestamp (RFC 3339), if any.
    pub timestamp: Option<String>,
}

/// An aggregate handed to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedAggregate {
    /// Which widget this result is for.
    pub kind: AggregateKind,
    /// Totals, or `None` for "no data".
    pub totals: Option<AggregateTotals>,
    /// Data timestamp for display.
    pub timestamp: Option<DateTime<Utc>>,
    /// Source of the totals.
    pub provenance: Provenance,
    /// True for a realtime value served before its window made it authoritative.
    pub provisional: bool,
}

impl ServedAggregate {
    /// A "no data" result for `kind`.
    #[must_use]
    pub const fn no_data(kind: AggregateKind) -> Self {
        Self {
            kind,
            totals: None,
            timestamp: None,
            provenance: Provenance::NoData,
            provisional: false,
        }
    }

    /// A realtime result, or "no data" when `totals` is `None`.
    #[must_use]
    pub fn realtime(
        kind: AggregateKind,
        totals: Option<AggregateTotals>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        match totals {
            Some(t) => Self {
                kind,
                totals: Some(t),
                timestamp,
                provenance: Provenance::Realtime,
                provisional: false,
            },
            None => Self::no_data(kind),
        }
    }

    /// True when there is nothing to display.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        self.totals.is_none()
    }
}

/// All widget aggregates computed from one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSet {
    /// Live tracked-set aggregate.
    pub current: ServedAggregate,
    /// Close-of-day aggregate.
    pub close_of_day: ServedAggregate,
    /// After-hours aggregate.
    pub after_hours: ServedAggregate,
    /// Commodities aggregate.
    pub commodities: ServedAggregate,
}
