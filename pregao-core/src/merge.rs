//! Freshness merger: reconcile the snapshot store with newer snapshots.
//!
//! Per instrument and category the store keeps the snapshot with the later
//! source time. A stored snapshot whose time does not parse counts as having
//! no time at all, so any incoming snapshot that carries a time string
//! replaces it.

use std::collections::BTreeMap;

use pregao_types::{HistoricalSnapshot, MergeOutcome, SnapshotCategory, SnapshotEntry, SnapshotRef};

use crate::store::SnapshotStore;
use crate::time::parse_opt;

fn has_time(snapshot: &SnapshotRef) -> bool {
    snapshot.time.as_deref().is_some_and(|t| !t.trim().is_empty())
}

/// Decide whether `incoming` should replace `stored` for one category.
#[must_use]
pub fn should_adopt(stored: Option<&SnapshotRef>, incoming: Option<&SnapshotRef>) -> bool {
    let Some(incoming) = incoming else {
        return false;
    };
    if !has_time(incoming) {
        return false;
    }
    let Some(stored_ts) = stored.and_then(|s| parse_opt(s.time.as_deref())) else {
        return true;
    };
    parse_opt(incoming.time.as_deref()).is_some_and(|ts| ts > stored_ts)
}

fn record(outcome: &mut MergeOutcome, category: SnapshotCategory) {
    match category {
        SnapshotCategory::Closing => outcome.closing_updated += 1,
        SnapshotCategory::AfterHours => outcome.after_hours_updated += 1,
    }
}

/// Merge a single instrument's snapshots into the store.
pub fn merge_entry(store: &mut SnapshotStore, instrument: &str, live: &SnapshotEntry) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let Some(existing) = store.entry_mut(instrument) else {
        store.insert(instrument.to_string(), live.clone());
        outcome.inserted += 1;
        return outcome;
    };
    for category in SnapshotCategory::ALL {
        if should_adopt(existing.get(category), live.get(category)) {
            *existing.slot_mut(category) = live.get(category).cloned();
            record(&mut outcome, category);
        }
    }
    outcome
}

/// Merge every instrument of a live payload's embedded snapshots.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(store, live), fields(instruments = live.len()))
)]
pub fn merge_live_snapshots(
    store: &mut SnapshotStore,
    live: &BTreeMap<String, SnapshotEntry>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    for (instrument, entry) in live {
        outcome.absorb(merge_entry(store, instrument, entry));
    }
    #[cfg(feature = "tracing")]
    if outcome.changed() {
        tracing::debug!(
            inserted = outcome.inserted,
            closing = outcome.closing_updated,
            after_hours = outcome.after_hours_updated,
            "merged live snapshots"
        );
    }
    outcome
}

/// Merge one record from the history endpoint.
pub fn merge_historical(store: &mut SnapshotStore, record: &HistoricalSnapshot) -> MergeOutcome {
    let entry = SnapshotEntry::with(record.category, record.to_snapshot_ref());
    merge_entry(store, &record.instrument, &entry)
}
