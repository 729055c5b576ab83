//! pregao-mock
//!
//! Connectors and clocks for exercising the pregao engine without a backend.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pregao_core::connector::{
    HistoryProvider, MarketDataProvider, PregaoConnector, RefreshProvider,
};
use pregao_core::{Clock, HistoricalSnapshot, HistoryRequest, MarketPayload, PregaoError};

mod dynamic;
pub mod fixtures;

pub use dynamic::{DynamicMockConnector, DynamicMockController, HistoryCall, MockBehavior};

/// Mock connector for CI-safe demos. Provides deterministic data from static fixtures.
///
/// The ticker `FAIL` makes history calls fail with a connector error.
pub struct MockConnector;

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PregaoConnector for MockConnector {
    fn name(&self) -> &'static str {
        "pregao-mock"
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        Some(self as &dyn HistoryProvider)
    }

    fn as_market_data_provider(&self) -> Option<&dyn MarketDataProvider> {
        Some(self as &dyn MarketDataProvider)
    }

    fn as_refresh_provider(&self) -> Option<&dyn RefreshProvider> {
        Some(self as &dyn RefreshProvider)
    }
}

#[async_trait]
impl HistoryProvider for MockConnector {
    async fn latest_snapshot(
        &self,
        req: &HistoryRequest,
    ) -> Result<Option<HistoricalSnapshot>, PregaoError> {
        if req.instrument == "FAIL" {
            return Err(PregaoError::connector(
                self.name(),
                format!("forced failure: history {}", req.category),
            ));
        }
        Ok(fixtures::previous_day_snapshot(&req.instrument, req.category))
    }
}

#[async_trait]
impl MarketDataProvider for MockConnector {
    async fn market_data(&self) -> Result<MarketPayload, PregaoError> {
        Ok(fixtures::market_payload())
    }
}

#[async_trait]
impl RefreshProvider for MockConnector {
    async fn force_refresh(&self) -> Result<(), PregaoError> {
        Ok(())
    }
}

/// Clock whose instant only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("mutex poisoned") = now;
    }

    /// Move forward by `by`.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("mutex poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("mutex poisoned")
    }
}
