use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::helpers::*;

use pregao::{Engine, PregaoConnector, PregaoError, SnapshotCategory};
use pregao_core::SnapshotRef;
use pregao_mock::MockBehavior;
use tokio::time::Instant;

type Key = (String, SnapshotCategory);

fn expected_requests() -> Vec<Key> {
    TRACKED
        .iter()
        .flat_map(|id| SnapshotCategory::ALL.map(|c| ((*id).to_string(), c)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn backfill_runs_paced_batches_of_four() {
    let h = harness_at(close_window());
    let start = Instant::now();
    let report = h.engine.backfill().await;
    let elapsed = start.elapsed();

    assert_eq!(report.requested, 16);
    assert_eq!(report.empty, 16);
    assert_eq!(report.failed, 0);

    // Three gaps between four batches, none after the last one.
    assert!(elapsed >= Duration::from_millis(600), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(650), "elapsed {elapsed:?}");

    let mut log = h.ctl.history_log().await;
    assert_eq!(log.len(), 16);
    log.sort_by_key(|c| c.at);
    let expected = expected_requests();
    for (i, (batch, want)) in log.chunks(4).zip(expected.chunks(4)).enumerate() {
        let first = batch[0].at;
        assert!(batch.iter().all(|c| c.at == first), "batch {i} did not start together");
        let offset = first.duration_since(start);
        let floor = Duration::from_millis(200) * u32::try_from(i).unwrap();
        assert!(offset >= floor && offset < floor + Duration::from_millis(20), "batch {i} at {offset:?}");

        let got: HashSet<Key> = batch.iter().map(|c| (c.instrument.clone(), c.category)).collect();
        let want: HashSet<Key> = want.iter().cloned().collect();
        assert_eq!(got, want, "batch {i}");
    }
}

#[tokio::test(start_paused = true)]
async fn failed_request_is_counted_and_queue_continues() {
    let h = harness_at(close_window());
    h.ctl
        .set_history_behavior(
            "ITUB",
            SnapshotCategory::Closing,
            MockBehavior::Fail(PregaoError::connector("dyn", "boom")),
        )
        .await;
    h.ctl
        .set_history_behavior(
            "PBR",
            SnapshotCategory::Closing,
            MockBehavior::Return(Some(history("PBR", SnapshotCategory::Closing, 1.5, "2024-05-01T20:00:00Z"))),
        )
        .await;
    h.ctl
        .set_history_behavior(
            "VALE",
            SnapshotCategory::AfterHours,
            MockBehavior::Return(Some(history("VALE", SnapshotCategory::AfterHours, -0.4, "2024-05-01T23:00:00Z"))),
        )
        .await;

    let report = h.engine.backfill().await;
    assert_eq!(report.requested, 16);
    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.empty, 13);
    assert!(h.engine.is_loaded());

    // Connector errors are transient and retried up to the policy limit.
    assert_eq!(h.ctl.history_calls("ITUB", SnapshotCategory::Closing).await, 3);
    // Requests after the failing one were still issued.
    assert_eq!(h.ctl.history_calls("BDORY", SnapshotCategory::AfterHours).await, 1);

    let store = h.engine.snapshot_store().await;
    assert_eq!(
        store.snapshot("PBR", SnapshotCategory::Closing).and_then(|s| s.change_percent),
        Some(1.5)
    );
    assert!(store.snapshot("ITUB", SnapshotCategory::Closing).is_none());
}

#[tokio::test(start_paused = true)]
async fn hung_request_times_out_without_blocking_the_queue() {
    let h = harness_at(close_window());
    h.ctl
        .set_history_behavior("BBD", SnapshotCategory::AfterHours, MockBehavior::Hang)
        .await;

    let start = Instant::now();
    let report = h.engine.backfill().await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.empty, 15);
    // Three 10s attempts plus 1s and 2s of backoff inside the second batch.
    assert!(start.elapsed() >= Duration::from_secs(33));
    assert!(h.engine.is_loaded());
}

#[tokio::test(start_paused = true)]
async fn backfill_never_replaces_fresher_live_snapshots() {
    let h = harness_at(close_window());
    let live = payload(&[(
        "PBR",
        Some(1.0),
        Some(snap(1.1, "2024-05-02T20:00:00Z")),
        None,
    )]);
    h.engine.apply_payload(&live).await;

    h.ctl
        .set_history_behavior(
            "PBR",
            SnapshotCategory::Closing,
            MockBehavior::Return(Some(history("PBR", SnapshotCategory::Closing, 9.9, "2024-05-01T20:00:00Z"))),
        )
        .await;
    h.ctl
        .set_history_behavior(
            "PBR",
            SnapshotCategory::AfterHours,
            MockBehavior::Return(Some(history("PBR", SnapshotCategory::AfterHours, 0.2, "2024-05-01T23:00:00Z"))),
        )
        .await;

    let report = h.engine.backfill().await;
    assert_eq!(report.applied, 1);

    let store = h.engine.snapshot_store().await;
    let entry = store.get("PBR").unwrap();
    assert_eq!(entry.closing, Some(snap(1.1, "2024-05-02T20:00:00Z")));
    assert_eq!(
        entry.after_hours,
        Some(SnapshotRef {
            price: Some(10.0),
            change_percent: Some(0.2),
            time: Some("2024-05-01T23:00:00Z".into()),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_backfill_applies_nothing_new() {
    let h = harness_at(close_window());
    h.ctl
        .set_history_behavior(
            "VALE",
            SnapshotCategory::Closing,
            MockBehavior::Return(Some(history("VALE", SnapshotCategory::Closing, 2.0, "2024-05-01T20:00:00Z"))),
        )
        .await;

    let first = h.engine.backfill().await;
    let after_first = h.engine.snapshot_store().await;
    let second = h.engine.backfill().await;

    assert_eq!(first.applied, 1);
    assert_eq!(second.applied, 0);
    assert_eq!(second.empty, 16);
    assert_eq!(h.engine.snapshot_store().await, after_first);
}

struct MarketOnly;

impl PregaoConnector for MarketOnly {
    fn name(&self) -> &'static str {
        "market-only"
    }
}

#[tokio::test(start_paused = true)]
async fn connector_without_history_marks_every_request_failed() {
    let engine = Engine::builder()
        .with_connector(Arc::new(MarketOnly))
        .tracked_instruments(["PBR", "VALE"])
        .build()
        .unwrap();

    let report = engine.backfill().await;
    assert_eq!(report.requested, 4);
    assert_eq!(report.failed, 4);
    assert!(engine.is_loaded());
}
