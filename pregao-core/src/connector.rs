use async_trait::async_trait;

use crate::PregaoError;
use pregao_types::{HistoricalSnapshot, HistoryRequest, MarketPayload};

/// Focused role trait for connectors that serve historical snapshots.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetch the most recent snapshot for the requested (instrument, category).
    ///
    /// `Ok(None)` means the backend answered but holds no record. Failures are
    /// reported as errors, never as a sentinel value.
    async fn latest_snapshot(
        &self,
        req: &HistoryRequest,
    ) -> Result<Option<HistoricalSnapshot>, PregaoError>;
}

/// Focused role trait for connectors that serve the live market payload.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the current market payload.
    async fn market_data(&self) -> Result<MarketPayload, PregaoError>;
}

/// Focused role trait for connectors that can ask the backend to recompute its data.
#[async_trait]
pub trait RefreshProvider: Send + Sync {
    /// Trigger a backend-side refresh. The response body is ignored.
    async fn force_refresh(&self) -> Result<(), PregaoError>;
}

/// Main connector trait implemented by data sources and middleware wrappers.
///
/// Capabilities are discovered through the `as_*_provider` accessors; the
/// default implementation advertises none.
pub trait PregaoConnector: Send + Sync {
    /// Stable connector name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Human-readable vendor name.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Historical snapshot capability.
    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        None
    }

    /// Live payload capability.
    fn as_market_data_provider(&self) -> Option<&dyn MarketDataProvider> {
        None
    }

    /// Backend refresh capability.
    fn as_refresh_provider(&self) -> Option<&dyn RefreshProvider> {
        None
    }
}
