//! Widget computation for one market payload.

use chrono::{DateTime, Utc};
use pregao_core::aggregate::{
    after_hours_candidate, after_hours_variation, closing_candidate, closing_variation,
    commodity_candidate, current_candidates, current_variation,
};
use pregao_core::{
    AggregateKind, AggregateTotals, CacheKind, MarketPayload, ServedAggregate, SnapshotStore,
    WidgetSet, aggregate_variations, contributing_timestamp, merge_live_snapshots,
};

use crate::core::Engine;

impl Engine {
    /// Tracked instruments present in `payload`, in tracked order.
    #[must_use]
    pub fn active_instruments(&self, payload: &MarketPayload) -> Vec<String> {
        self.cfg
            .tracked_instruments
            .iter()
            .filter(|id| payload.quotes.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Merge `payload`'s embedded snapshots and compute every widget.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pregao::apply_payload", skip(self, payload))
    )]
    pub async fn apply_payload(&self, payload: &MarketPayload) -> WidgetSet {
        let now = self.clock.now();
        let inputs = {
            let mut store = self.store.lock().await;
            merge_live_snapshots(&mut store, &payload.embedded_snapshots);
            self.stored_inputs(&store, payload)
        };
        self.serve_widgets(&inputs, payload, now)
    }

    /// Compute every widget from `payload` and the current store, without merging.
    pub async fn widgets(&self, payload: &MarketPayload) -> WidgetSet {
        let now = self.clock.now();
        let inputs = {
            let store = self.store.lock().await;
            self.stored_inputs(&store, payload)
        };
        self.serve_widgets(&inputs, payload, now)
    }

    fn stored_inputs(&self, store: &SnapshotStore, payload: &MarketPayload) -> StoredInputs {
        let adrs = self.active_instruments(payload);
        StoredInputs {
            closing: Realtime {
                totals: aggregate_variations(&adrs, store, closing_variation),
                timestamp: contributing_timestamp(&adrs, store, closing_variation, closing_candidate),
            },
            after_hours: Realtime {
                totals: aggregate_variations(&adrs, store, after_hours_variation),
                timestamp: contributing_timestamp(
                    &adrs,
                    store,
                    after_hours_variation,
                    after_hours_candidate,
                ),
            },
        }
    }

    // Runs without the store lock: the daily cache may write to disk.
    fn serve_widgets(
        &self,
        inputs: &StoredInputs,
        payload: &MarketPayload,
        now: DateTime<Utc>,
    ) -> WidgetSet {
        let adrs = self.active_instruments(payload);
        let quotes = &payload.quotes;

        let current = ServedAggregate::realtime(
            AggregateKind::Current,
            aggregate_variations(&adrs, quotes, current_variation),
            contributing_timestamp(&adrs, quotes, current_variation, current_candidates),
        );

        let close_of_day = self.cache.serve(
            CacheKind::CloseOfDay,
            now,
            inputs.closing.totals,
            || inputs.closing.timestamp,
        );

        let after_hours = self.cache.serve(
            CacheKind::AfterHours,
            now,
            inputs.after_hours.totals,
            || inputs.after_hours.timestamp,
        );

        let commodities_set = &self.cfg.commodity_instruments;
        let commodities = ServedAggregate::realtime(
            AggregateKind::Commodities,
            aggregate_variations(commodities_set, quotes, current_variation),
            contributing_timestamp(commodities_set, quotes, current_variation, commodity_candidate),
        );

        WidgetSet {
            current,
            close_of_day,
            after_hours,
            commodities,
        }
    }
}

/// Realtime aggregate and its data time.
struct Realtime {
    totals: Option<AggregateTotals>,
    timestamp: Option<DateTime<Utc>>,
}

/// Store-derived inputs of the cacheable widgets.
struct StoredInputs {
    closing: Realtime,
    after_hours: Realtime,
}
