//! Response shapes of the dashboard backend.

use std::collections::BTreeMap;

use pregao_core::{
    AfterHoursRef, HistoricalSnapshot, HistoryRequest, LiveQuote, MarketPayload, Series,
    SnapshotEntry, SnapshotRef,
};
use serde::Deserialize;

/// `{"status": "...", "data": ..., "timestamp": ...}` wrapper used by every endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub variation: Option<f64>,
    #[serde(default)]
    pub source_time: Option<String>,
}

impl HistoryRecord {
    pub fn into_snapshot(self, req: &HistoryRequest) -> HistoricalSnapshot {
        HistoricalSnapshot {
            instrument: req.instrument.clone(),
            category: req.category,
            price: self.price,
            variation_percent: self.variation,
            source_time: self.source_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub variation: Option<f64>,
    #[serde(default)]
    pub at_close: Option<SnapshotRef>,
    #[serde(default)]
    pub after_hours: Option<AfterHoursRef>,
    #[serde(default, alias = "sparkline")]
    pub series: Option<Series>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<Quote> for LiveQuote {
    fn from(q: Quote) -> Self {
        Self {
            current: q.current,
            variation_percent: q.variation,
            at_close: q.at_close,
            after_hours: q.after_hours,
            series: q.series.unwrap_or_default(),
            timestamp: q.timestamp,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Macro {
    #[serde(default)]
    pub oil: Option<Quote>,
    #[serde(default)]
    pub brent: Option<Quote>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub adrs: BTreeMap<String, Quote>,
    #[serde(default)]
    pub adrs_snapshots: BTreeMap<String, SnapshotEntry>,
    #[serde(default, rename = "macro")]
    pub macro_data: Option<Macro>,
    #[serde(default)]
    pub iron: Option<Quote>,
}

impl MarketData {
    /// Flatten into a payload; `macro.oil`, `macro.brent` and `iron` become `WTI`, `BRENT` and `IRON`.
    pub fn into_payload(self, timestamp: Option<String>) -> MarketPayload {
        let mut quotes: BTreeMap<String, LiveQuote> = self
            .adrs
            .into_iter()
            .map(|(ticker, q)| (ticker, q.into()))
            .collect();
        let macro_data = self.macro_data.unwrap_or_default();
        for (ticker, quote) in [
            ("WTI", macro_data.oil),
            ("BRENT", macro_data.brent),
            ("IRON", self.iron),
        ] {
            if let Some(q) = quote {
                quotes.insert(ticker.to_string(), q.into());
            }
        }
        MarketPayload {
            quotes,
            embedded_snapshots: self.adrs_snapshots,
            timestamp,
        }
    }
}
