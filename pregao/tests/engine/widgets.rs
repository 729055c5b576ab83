use std::sync::Arc;

use crate::helpers::*;

use chrono::Duration as ChronoDuration;
use pregao::{AggregateTotals, Engine, KeyValueStore, Provenance, ServedAggregate};
use pregao_core::{CloseOfDayWindow, SnapshotRef, WindowConfig, parse_timestamp};
use pregao_mock::{DynamicMockConnector, ManualClock, fixtures};

fn totals(served: &ServedAggregate) -> AggregateTotals {
    served
        .totals
        .unwrap_or_else(|| panic!("{} has no data", served.kind))
}

fn assert_totals(served: &ServedAggregate, pos: f64, neg: f64) {
    let t = totals(served);
    assert!(approx(t.positive_sum, pos), "{}: pos {} != {pos}", served.kind, t.positive_sum);
    assert!(approx(t.negative_sum, neg), "{}: neg {} != {neg}", served.kind, t.negative_sum);
    assert!(approx(t.total, pos + neg), "{}: total {}", served.kind, t.total);
}

#[tokio::test]
async fn live_widgets_cover_present_instruments_only() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    let payload = fixtures::market_payload();

    assert_eq!(
        h.engine.active_instruments(&payload),
        vec!["PBR", "PBR-A", "ITUB", "BBD", "BSBR", "VALE"]
    );

    let w = h.engine.apply_payload(&payload).await;
    assert_totals(&w.current, 4.10, -1.74);
    assert_eq!(w.current.provenance, Provenance::Realtime);
    assert_eq!(w.current.timestamp, parse_timestamp(fixtures::PAYLOAD_TIME));

    assert_totals(&w.commodities, 1.65, -0.30);
    assert_eq!(w.commodities.timestamp, parse_timestamp(fixtures::PAYLOAD_TIME));
}

#[tokio::test]
async fn in_window_aggregates_are_persisted_for_the_local_day() {
    // 18:30 in Sao Paulo, 17:30 in New York.
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    let w = h.engine.apply_payload(&fixtures::market_payload()).await;

    assert_totals(&w.close_of_day, 3.85, -1.65);
    assert_eq!(w.close_of_day.provenance, Provenance::Realtime);
    assert_eq!(w.close_of_day.timestamp, parse_timestamp(fixtures::CLOSE_TIME));

    assert_totals(&w.after_hours, 0.80, -0.30);
    assert_eq!(w.after_hours.provenance, Provenance::Realtime);
    assert_eq!(w.after_hours.timestamp, parse_timestamp(fixtures::AFTER_HOURS_TIME));

    assert!(h.kv.get("close-of-day:2024-05-02").unwrap().is_some());
    assert!(h.kv.get("after-hours:2024-05-02").unwrap().is_some());
}

#[tokio::test]
async fn next_morning_serves_yesterdays_close() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    h.engine.apply_payload(&fixtures::market_payload()).await;

    // 10:00 in Sao Paulo, 09:00 in New York.
    h.clock.set(dt(2024, 5, 3, 13, 0));
    let w = h.engine.widgets(&fixtures::market_payload()).await;

    assert_totals(&w.close_of_day, 3.85, -1.65);
    assert_eq!(w.close_of_day.provenance, Provenance::CachedYesterday);
    assert_eq!(w.close_of_day.timestamp, parse_timestamp(fixtures::CLOSE_TIME));

    // Nothing persisted for the new New York day: realtime, flagged provisional.
    assert_eq!(w.after_hours.provenance, Provenance::Realtime);
    assert!(w.after_hours.provisional);
    assert!(h.kv.get("after-hours:2024-05-03").unwrap().is_none());
}

#[tokio::test]
async fn close_of_day_before_the_window_has_no_data() {
    // 16:59 in Sao Paulo with nothing persisted.
    let h = harness_at(dt(2024, 5, 2, 19, 59));
    let w = h.engine.apply_payload(&fixtures::market_payload()).await;

    assert!(w.close_of_day.is_no_data());
    assert_eq!(w.close_of_day.provenance, Provenance::NoData);
    assert!(h.kv.get("close-of-day:2024-05-02").unwrap().is_none());

    h.clock.advance(ChronoDuration::minutes(1));
    let w = h.engine.widgets(&fixtures::market_payload()).await;
    assert_eq!(w.close_of_day.provenance, Provenance::Realtime);
    assert!(h.kv.get("close-of-day:2024-05-02").unwrap().is_some());
}

#[tokio::test]
async fn after_hours_entry_survives_the_window_close() {
    // 18:00 in New York.
    let h = harness_at(dt(2024, 5, 2, 22, 0));
    h.engine.apply_payload(&fixtures::market_payload()).await;

    // 22:00 in New York; a different payload must not replace the persisted value.
    h.clock.set(dt(2024, 5, 3, 2, 0));
    let later = payload(&[(
        "PBR",
        Some(3.0),
        None,
        Some(snap(5.0, "2024-05-03T01:30:00Z")),
    )]);
    let w = h.engine.apply_payload(&later).await;
    assert_eq!(w.after_hours.provenance, Provenance::CachedToday);
    assert!(!w.after_hours.provisional);
    assert_totals(&w.after_hours, 0.80, -0.30);
}

#[tokio::test]
async fn nan_and_missing_variations_do_not_contribute() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    let nan = |time: &str| SnapshotRef::new(10.0, f64::NAN, time);
    let mut p = payload(&[
        (
            "PBR",
            Some(1.0),
            Some(snap(0.7, "2024-05-02T20:00:00Z")),
            Some(snap(-0.3, "2024-05-02T21:05:00Z")),
        ),
        (
            "VALE",
            Some(f64::NAN),
            Some(nan("2024-05-02T20:10:00Z")),
            Some(nan("2024-05-02T21:20:00Z")),
        ),
        ("ITUB", None, None, None),
        ("BBD", Some(-0.5), None, None),
    ]);
    p.quotes.insert("BRENT".into(), commodity(Some(0.5), "2024-05-02T18:00:00Z"));
    p.quotes.insert("WTI".into(), commodity(Some(f64::NAN), "2024-05-02T19:00:00Z"));
    p.quotes.insert("IRON".into(), commodity(None, "2024-05-02T19:30:00Z"));

    let w = h.engine.apply_payload(&p).await;
    assert_totals(&w.current, 1.0, -0.5);
    assert_totals(&w.close_of_day, 0.7, 0.0);
    assert_totals(&w.after_hours, 0.0, -0.3);
    assert_totals(&w.commodities, 0.5, 0.0);

    // Times come from the contributing snapshots only.
    assert_eq!(w.close_of_day.timestamp, parse_timestamp("2024-05-02T20:00:00Z"));
    assert_eq!(w.after_hours.timestamp, parse_timestamp("2024-05-02T21:05:00Z"));
}

#[tokio::test]
async fn commodities_time_comes_from_contributing_quotes() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    let mut p = payload(&[]);
    p.quotes.insert("BRENT".into(), commodity(Some(0.5), "2024-05-02T18:00:00Z"));
    p.quotes.insert("WTI".into(), commodity(None, "2024-05-02T23:59:00Z"));

    let w = h.engine.apply_payload(&p).await;
    assert_totals(&w.commodities, 0.5, 0.0);
    assert_eq!(w.commodities.timestamp, parse_timestamp("2024-05-02T18:00:00Z"));
}

#[tokio::test]
async fn no_contributing_instruments_means_no_timestamp() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    let mut p = payload(&[("PBR", None, None, None)]);
    p.quotes.insert("WTI".into(), commodity(None, "2024-05-02T23:59:00Z"));

    let w = h.engine.apply_payload(&p).await;
    assert!(w.current.is_no_data());
    assert_eq!(w.current.timestamp, None);
    assert!(w.commodities.is_no_data());
    assert_eq!(w.commodities.timestamp, None);
}

#[tokio::test]
async fn provisional_close_before_the_window_when_enabled() {
    let (builder, ..) = builder_at(dt(2024, 5, 2, 19, 59));
    let windows = WindowConfig {
        close_of_day: CloseOfDayWindow {
            provisional_pre_window: true,
            ..CloseOfDayWindow::default()
        },
        ..WindowConfig::default()
    };
    let engine = builder.windows(windows).build().unwrap();

    let w = engine.apply_payload(&fixtures::market_payload()).await;
    assert_totals(&w.close_of_day, 3.85, -1.65);
    assert_eq!(w.close_of_day.provenance, Provenance::Realtime);
    assert!(w.close_of_day.provisional);
}

#[tokio::test]
async fn daily_cache_writes_run_without_the_store_lock() {
    let observer = Arc::new(WriteObserver::default());
    let (conn, _ctl) = DynamicMockConnector::new_with_controller("dyn");
    let engine = Arc::new(
        Engine::builder()
            .with_connector(conn)
            .clock(Arc::new(ManualClock::new(dt(2024, 5, 2, 21, 30))))
            .key_value_store(observer.clone())
            .build()
            .unwrap(),
    );
    observer.watch(&engine);

    engine.apply_payload(&fixtures::market_payload()).await;
    // One write per cacheable widget, each with the store lock free.
    assert_eq!(observer.lock_free_on_write(), vec![true, true]);
}

#[tokio::test]
async fn zero_variations_yield_zero_totals_not_no_data() {
    let h = harness_at(dt(2024, 5, 2, 21, 30));
    let p = payload(&[("BSBR", Some(0.0), None, None)]);
    let w = h.engine.apply_payload(&p).await;
    assert_eq!(totals(&w.current), AggregateTotals::default());
}

#[tokio::test]
async fn storage_failures_degrade_to_realtime() {
    let (conn, _ctl) = DynamicMockConnector::new_with_controller("dyn");
    let clock = Arc::new(ManualClock::new(dt(2024, 5, 2, 21, 30)));
    let engine = Engine::builder()
        .with_connector(conn)
        .clock(clock.clone())
        .key_value_store(Arc::new(FailingStore))
        .build()
        .unwrap();

    let w = engine.apply_payload(&fixtures::market_payload()).await;
    assert_totals(&w.close_of_day, 3.85, -1.65);
    assert_eq!(w.close_of_day.provenance, Provenance::Realtime);

    clock.set(dt(2024, 5, 3, 13, 0));
    let w = engine.widgets(&fixtures::market_payload()).await;
    assert!(w.close_of_day.is_no_data());
}
