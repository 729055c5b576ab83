//! Deterministic market data used by the static mock connector and tests.

use std::collections::BTreeMap;

use pregao_core::{
    AfterHoursRef, HistoricalSnapshot, LiveQuote, MarketPayload, Series, SnapshotCategory,
    SnapshotEntry, SnapshotRef,
};

/// Data time of the fixture payload.
pub const PAYLOAD_TIME: &str = "2024-05-02T21:15:00Z";

/// Close time embedded in the fixture payload.
pub const CLOSE_TIME: &str = "2024-05-02T20:00:00Z";

/// After-hours time embedded in the fixture payload.
pub const AFTER_HOURS_TIME: &str = "2024-05-02T21:10:00Z";

/// `(ticker, price, variation, close variation, after-hours variation)`.
const ADRS: &[(&str, f64, f64, f64, f64)] = &[
    ("PBR", 14.62, 1.25, 1.10, 0.35),
    ("PBR-A", 13.90, 0.80, 0.75, -0.10),
    ("ITUB", 6.21, -0.64, -0.60, 0.05),
    ("BBD", 2.71, -1.10, -1.05, -0.20),
    ("BSBR", 5.02, 0.00, 0.00, 0.00),
    ("VALE", 12.40, 2.05, 2.00, 0.40),
];

/// `(ticker, price, variation)`.
const COMMODITIES: &[(&str, f64, f64)] = &[
    ("BRENT", 83.40, 0.45),
    ("WTI", 79.10, -0.30),
    ("IRON", 117.5, 1.20),
];

/// A full market payload with six ADRs and three commodities.
///
/// `BBDO` and `BDORY` are absent so the tracked set is partially covered.
#[must_use]
pub fn market_payload() -> MarketPayload {
    let mut quotes = BTreeMap::new();
    let mut embedded = BTreeMap::new();
    for &(ticker, price, variation, close_var, ah_var) in ADRS {
        quotes.insert(
            ticker.to_string(),
            LiveQuote {
                current: Some(price),
                variation_percent: Some(variation),
                at_close: Some(SnapshotRef::new(price, close_var, CLOSE_TIME)),
                after_hours: Some(AfterHoursRef {
                    snapshot: SnapshotRef::new(price, ah_var, AFTER_HOURS_TIME),
                    available: true,
                }),
                series: Series {
                    closes: vec![price * 0.99, price],
                    timestamps: vec![CLOSE_TIME.to_string(), PAYLOAD_TIME.to_string()],
                },
                timestamp: Some(PAYLOAD_TIME.to_string()),
            },
        );
        embedded.insert(
            ticker.to_string(),
            SnapshotEntry {
                closing: Some(SnapshotRef::new(price, close_var, CLOSE_TIME)),
                after_hours: Some(SnapshotRef::new(price, ah_var, AFTER_HOURS_TIME)),
            },
        );
    }
    for &(ticker, price, variation) in COMMODITIES {
        quotes.insert(
            ticker.to_string(),
            LiveQuote {
                current: Some(price),
                variation_percent: Some(variation),
                timestamp: Some(PAYLOAD_TIME.to_string()),
                ..LiveQuote::default()
            },
        );
    }
    MarketPayload {
        quotes,
        embedded_snapshots: embedded,
        timestamp: Some(PAYLOAD_TIME.to_string()),
    }
}

/// A history record for `ticker` one day before the fixture payload.
#[must_use]
pub fn previous_day_snapshot(ticker: &str, category: SnapshotCategory) -> Option<HistoricalSnapshot> {
    let &(_, price, _, close_var, ah_var) = ADRS.iter().find(|(t, ..)| *t == ticker)?;
    let (variation, time) = match category {
        SnapshotCategory::Closing => (close_var, "2024-05-01T20:00:00Z"),
        SnapshotCategory::AfterHours => (ah_var, "2024-05-01T23:30:00Z"),
    };
    Some(HistoricalSnapshot {
        instrument: ticker.to_string(),
        category,
        price: Some(price),
        variation_percent: Some(variation / 2.0),
        source_time: Some(time.to_string()),
    })
}
