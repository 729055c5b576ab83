use crate::helpers::*;

use pregao::{Engine, EngineConfig, PregaoError};
use pregao_core::{AfterHoursWindow, CloseOfDayWindow, IngestionConfig, RetryPolicy, WindowConfig};
use pregao_mock::fixtures;

fn assert_invalid(result: Result<Engine, PregaoError>, needle: &str) {
    match result {
        Err(PregaoError::InvalidArg(msg)) => assert!(msg.contains(needle), "unexpected message: {msg}"),
        Err(other) => panic!("expected InvalidArg, got {other:?}"),
        Ok(_) => panic!("expected InvalidArg, got an engine"),
    }
}

#[test]
fn build_requires_a_connector() {
    assert_invalid(Engine::builder().build(), "no connector");
}

#[test]
fn build_rejects_zero_batch_size() {
    let (builder, ..) = builder_at(close_window());
    let ingestion = IngestionConfig {
        batch_size: 0,
        ..IngestionConfig::default()
    };
    assert_invalid(builder.ingestion(ingestion).build(), "batch_size");
}

#[test]
fn build_rejects_zero_attempts() {
    let (builder, ..) = builder_at(close_window());
    let policy = RetryPolicy {
        max_attempts: 0,
        ..RetryPolicy::default()
    };
    assert_invalid(builder.retry_policy(policy).build(), "max_attempts");
}

#[test]
fn build_rejects_out_of_range_windows() {
    let (builder, ..) = builder_at(close_window());
    let windows = WindowConfig {
        close_of_day: CloseOfDayWindow {
            open_hour: 24,
            ..CloseOfDayWindow::default()
        },
        ..WindowConfig::default()
    };
    assert_invalid(builder.windows(windows).build(), "open_hour");

    let (builder, ..) = builder_at(close_window());
    let windows = WindowConfig {
        after_hours: AfterHoursWindow {
            start_hour: 21,
            end_hour: 17,
            ..AfterHoursWindow::default()
        },
        ..WindowConfig::default()
    };
    assert_invalid(builder.windows(windows).build(), "start_hour < end_hour");
}

#[test]
fn defaults_track_the_adr_set() {
    let h = harness_at(close_window());
    let cfg = h.engine.config();
    assert_eq!(cfg.tracked_instruments, TRACKED.map(String::from).to_vec());
    assert_eq!(cfg.commodity_instruments, vec!["BRENT", "WTI", "IRON"]);
    assert_eq!(cfg.ingestion.batch_size, 4);
    assert_eq!(cfg.retry.max_attempts, 3);
    assert!(!h.engine.is_loaded());
}

#[tokio::test]
async fn config_from_json_applies_key_prefix_and_tracked_set() {
    let cfg: EngineConfig = serde_json::from_str(
        r#"{ "tracked_instruments": ["PBR", "VALE"], "cache_key_prefix": "dash" }"#,
    )
    .unwrap();
    let (builder, _ctl, _clock, kv) = builder_at(dt(2024, 5, 2, 21, 30));
    let engine = builder.config(cfg).build().unwrap();

    let widgets = engine.apply_payload(&fixtures::market_payload()).await;
    let totals = widgets.close_of_day.totals.unwrap();
    // PBR 1.10 + VALE 2.00
    assert!(approx(totals.positive_sum, 3.10));
    assert!(approx(totals.negative_sum, 0.0));

    use pregao::KeyValueStore;
    assert!(kv.get("dash:close-of-day:2024-05-02").unwrap().is_some());
    assert!(kv.get("close-of-day:2024-05-02").unwrap().is_none());
}
