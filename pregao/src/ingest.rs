//! Snapshot backfill queue.
//!
//! One history request per (tracked instrument, category) is drained in
//! fixed-size batches. Requests inside a batch run concurrently and are merged
//! as they complete; consecutive batches are separated by the pacing delay.

use std::sync::atomic::Ordering;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use pregao_core::{
    HistoryRequest, IngestionReport, SnapshotCategory, merge_historical,
};

use crate::core::Engine;

impl Engine {
    /// Build the request list for the tracked set, instrument by instrument.
    pub(crate) fn backfill_requests(&self) -> Vec<HistoryRequest> {
        let limit = self.cfg.ingestion.history_limit.max(1);
        self.cfg
            .tracked_instruments
            .iter()
            .flat_map(|id| {
                SnapshotCategory::ALL.map(|category| HistoryRequest {
                    instrument: id.clone(),
                    category,
                    limit,
                })
            })
            .collect()
    }

    /// Backfill the snapshot store from the history endpoint.
    ///
    /// Failed requests are counted and skipped; they never abort the batch or
    /// the queue. The loaded flag is set when the queue drains, whatever the
    /// outcome, so [`refresh`](Self::refresh) backfills at most once.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pregao::backfill", skip(self))
    )]
    pub async fn backfill(&self) -> IngestionReport {
        let requests = self.backfill_requests();
        let mut report = IngestionReport {
            requested: requests.len(),
            ..IngestionReport::default()
        };

        let Some(provider) = self.connector.as_history_provider() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(connector = self.connector.name(), "connector has no history capability");
            report.failed = report.requested;
            self.loaded.store(true, Ordering::Release);
            return report;
        };

        let batch_size = self.cfg.ingestion.batch_size.max(1);
        for (i, batch) in requests.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.cfg.ingestion.pacing).await;
            }
            let mut inflight: FuturesUnordered<_> = batch
                .iter()
                .map(|req| async move { (req, provider.latest_snapshot(req).await) })
                .collect();

            while let Some((_req, result)) = inflight.next().await {
                match result {
                    Ok(Some(record)) => {
                        let outcome = {
                            let mut store = self.store.lock().await;
                            merge_historical(&mut store, &record)
                        };
                        if outcome.changed() {
                            report.applied += 1;
                        } else {
                            report.empty += 1;
                        }
                    }
                    Ok(None) => report.empty += 1,
                    Err(_e) => {
                        report.failed += 1;
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            instrument = %_req.instrument,
                            category = %_req.category,
                            error = %_e,
                            "history request failed"
                        );
                    }
                }
            }
        }

        self.loaded.store(true, Ordering::Release);
        #[cfg(feature = "tracing")]
        tracing::info!(
            requested = report.requested,
            applied = report.applied,
            empty = report.empty,
            failed = report.failed,
            "snapshot backfill finished"
        );
        report
    }
}
