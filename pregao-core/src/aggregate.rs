//! Variation aggregates over an instrument set.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use pregao_types::{AggregateTotals, LiveQuote, SnapshotEntry};

use crate::store::SnapshotStore;
use crate::time::parse_opt;

/// Keyed lookup of per-instrument records.
pub trait InstrumentSource {
    /// Record type held per instrument.
    type Entry;

    /// Record for `instrument`, if present.
    fn entry(&self, instrument: &str) -> Option<&Self::Entry>;
}

impl<V> InstrumentSource for BTreeMap<String, V> {
    type Entry = V;

    fn entry(&self, instrument: &str) -> Option<&V> {
        self.get(instrument)
    }
}

impl<V> InstrumentSource for HashMap<String, V> {
    type Entry = V;

    fn entry(&self, instrument: &str) -> Option<&V> {
        self.get(instrument)
    }
}

impl InstrumentSource for SnapshotStore {
    type Entry = SnapshotEntry;

    fn entry(&self, instrument: &str) -> Option<&SnapshotEntry> {
        self.get(instrument)
    }
}

/// Sum positive and negative variations of `instruments` found in `source`.
///
/// Instruments that are missing, or whose selected value is absent or NaN,
/// do not contribute. Returns `None` when nothing contributed; a set of zero
/// variations yields zeroed totals.
pub fn aggregate<S, F>(instruments: &[String], source: &S, selector: F) -> Option<AggregateTotals>
where
    S: InstrumentSource + ?Sized,
    F: Fn(&S::Entry) -> Option<f64>,
{
    let mut totals = AggregateTotals::default();
    let mut contributed = false;
    for value in instruments
        .iter()
        .filter_map(|id| source.entry(id))
        .filter_map(&selector)
        .filter(|v| !v.is_nan())
    {
        totals.add(value);
        contributed = true;
    }
    contributed.then_some(totals)
}

/// Live variation of a quote.
#[must_use]
pub const fn current_variation(quote: &LiveQuote) -> Option<f64> {
    quote.variation_percent
}

/// Variation of the stored closing snapshot.
#[must_use]
pub fn closing_variation(entry: &SnapshotEntry) -> Option<f64> {
    entry.closing.as_ref().and_then(|s| s.change_percent)
}

/// Variation of the stored after-hours snapshot.
#[must_use]
pub fn after_hours_variation(entry: &SnapshotEntry) -> Option<f64> {
    entry.after_hours.as_ref().and_then(|s| s.change_percent)
}

/// Latest parseable timestamp among the candidates of contributing entries.
///
/// Only entries whose `selector` value is present and not NaN are considered,
/// so the result always belongs to an instrument counted by [`aggregate`].
pub fn contributing_timestamp<'a, S, V, F, I>(
    instruments: &[String],
    source: &'a S,
    selector: V,
    candidates: F,
) -> Option<DateTime<Utc>>
where
    S: InstrumentSource + ?Sized,
    S::Entry: 'a,
    V: Fn(&S::Entry) -> Option<f64>,
    F: Fn(&'a S::Entry) -> I,
    I: IntoIterator<Item = Option<&'a str>>,
{
    instruments
        .iter()
        .filter_map(|id| source.entry(id))
        .filter(|entry| selector(*entry).is_some_and(|v| !v.is_nan()))
        .flat_map(candidates)
        .filter_map(parse_opt)
        .max()
}

/// Timestamps considered for the current widget: close, after-hours and quote time.
pub fn current_candidates(quote: &LiveQuote) -> [Option<&str>; 3] {
    [
        quote.at_close.as_ref().and_then(|s| s.time.as_deref()),
        quote
            .after_hours
            .as_ref()
            .and_then(|s| s.snapshot.time.as_deref()),
        quote.timestamp.as_deref(),
    ]
}

/// The first available of close, after-hours and quote time.
pub fn commodity_candidate(quote: &LiveQuote) -> [Option<&str>; 1] {
    [current_candidates(quote).into_iter().flatten().next()]
}

/// Stored closing snapshot time.
pub fn closing_candidate(entry: &SnapshotEntry) -> [Option<&str>; 1] {
    [entry.closing.as_ref().and_then(|s| s.time.as_deref())]
}

/// Stored after-hours snapshot time.
pub fn after_hours_candidate(entry: &SnapshotEntry) -> [Option<&str>; 1] {
    [entry.after_hours.as_ref().and_then(|s| s.time.as_deref())]
}
