use std::time::Duration;

use crate::helpers::*;

use pregao::{PregaoError, RefreshStatus};
use pregao_mock::{MockBehavior, fixtures};

async fn ready(h: &Harness) {
    h.ctl
        .set_market_data_behavior(MockBehavior::Return(fixtures::market_payload()))
        .await;
    h.ctl.set_refresh_behavior(MockBehavior::Return(())).await;
}

#[tokio::test(start_paused = true)]
async fn first_refresh_backfills_and_later_ones_do_not() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;

    let first = h.engine.refresh().await.unwrap();
    assert_eq!(first.status, RefreshStatus::Success);
    assert_eq!(first.ingestion.as_ref().map(|r| r.requested), Some(16));
    assert!(first.warnings.is_empty());
    assert!(first.widgets.is_some());

    let second = h.engine.refresh().await.unwrap();
    assert!(second.ingestion.is_none());
    assert_eq!(h.ctl.history_log().await.len(), 16);
    assert_eq!(h.ctl.market_data_calls().await, 2);
    assert_eq!(h.ctl.refresh_calls().await, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_backfill_still_counts_as_loaded() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    for id in TRACKED {
        for cat in pregao::SnapshotCategory::ALL {
            h.ctl
                .set_history_behavior(id, cat, MockBehavior::Fail(PregaoError::Data("bad envelope".into())))
                .await;
        }
    }

    let first = h.engine.refresh().await.unwrap();
    assert_eq!(first.ingestion.map(|r| r.failed), Some(16));
    assert_eq!(first.status, RefreshStatus::Success);

    let second = h.engine.refresh().await.unwrap();
    assert!(second.ingestion.is_none());
    // Data errors are not retried.
    assert_eq!(h.ctl.history_log().await.len(), 16);
}

#[tokio::test(start_paused = true)]
async fn backend_refresh_failure_is_only_a_warning() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    h.ctl
        .set_refresh_behavior(MockBehavior::Fail(PregaoError::connector("dyn", "503")))
        .await;

    let report = h.engine.refresh().await.unwrap();
    assert_eq!(report.status, RefreshStatus::Success);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        PregaoError::RetriesExhausted { attempts: 3, .. }
    ));
    assert!(report.widgets.is_some());
}

#[tokio::test(start_paused = true)]
async fn payload_errors_map_to_invalid_payload() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    h.ctl
        .set_market_data_behavior(MockBehavior::Fail(PregaoError::Data("missing data".into())))
        .await;

    let report = h.engine.refresh().await.unwrap();
    assert_eq!(report.status, RefreshStatus::InvalidPayload);
    assert!(report.widgets.is_none());
    assert_eq!(h.ctl.market_data_calls().await, 1);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_map_to_connection_error() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    h.ctl
        .set_market_data_behavior(MockBehavior::Fail(PregaoError::connector("dyn", "refused")))
        .await;

    let report = h.engine.refresh().await.unwrap();
    assert_eq!(report.status, RefreshStatus::ConnectionError);
    assert_eq!(h.ctl.market_data_calls().await, 3);
    assert!(matches!(
        report.warnings.last().map(PregaoError::root_cause),
        Some(PregaoError::Connector { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn hung_market_data_times_out() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    h.ctl.set_market_data_behavior(MockBehavior::Hang).await;

    let report = h.engine.refresh().await.unwrap();
    assert_eq!(report.status, RefreshStatus::ConnectionError);
    assert!(matches!(
        report.warnings.last().map(PregaoError::root_cause),
        Some(PregaoError::ProviderTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn overlapping_refresh_is_rejected() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    h.ctl
        .set_market_data_behavior(MockBehavior::Delay(
            Duration::from_secs(5),
            fixtures::market_payload(),
        ))
        .await;

    let (first, second) = tokio::join!(h.engine.refresh(), async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.engine.refresh().await
    });
    assert_eq!(first.unwrap().status, RefreshStatus::Success);
    assert!(matches!(second, Err(PregaoError::RefreshInProgress)));

    // The guard is released once the running cycle ends.
    assert!(h.engine.refresh().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn cancelled_refresh_releases_the_guard() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;
    h.ctl.set_market_data_behavior(MockBehavior::Hang).await;

    let cancelled = tokio::time::timeout(Duration::from_secs(1), h.engine.refresh()).await;
    assert!(cancelled.is_err());

    h.ctl
        .set_market_data_behavior(MockBehavior::Return(fixtures::market_payload()))
        .await;
    let report = h.engine.refresh().await.unwrap();
    assert_eq!(report.status, RefreshStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn external_triggers_are_debounced() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;

    assert!(h.engine.request_refresh().await.is_ok());
    match h.engine.request_refresh().await {
        Err(PregaoError::Debounced { retry_in_ms }) => {
            assert!(retry_in_ms > 0 && retry_in_ms <= 2_000, "retry_in_ms {retry_in_ms}");
        }
        other => panic!("expected Debounced, got {other:?}"),
    }
    assert_eq!(h.ctl.market_data_calls().await, 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(h.engine.request_refresh().await.is_ok());
    assert_eq!(h.ctl.market_data_calls().await, 2);
}

#[tokio::test(start_paused = true)]
async fn periodic_refresh_is_not_debounced() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    ready(&h).await;

    assert!(h.engine.refresh().await.is_ok());
    assert!(h.engine.refresh().await.is_ok());
    assert_eq!(h.ctl.market_data_calls().await, 2);
}
