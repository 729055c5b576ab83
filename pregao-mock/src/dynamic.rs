use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use pregao_core::connector::{
    HistoryProvider, MarketDataProvider, PregaoConnector, RefreshProvider,
};
use pregao_core::{
    HistoricalSnapshot, HistoryRequest, MarketPayload, PregaoError, SnapshotCategory,
};

/// Instruction for how a method should behave for a given input.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(PregaoError),
    /// Fail with a transient connector error for the first `n` calls, then return the value.
    FailTimes(u32, T),
    /// Return the value after sleeping on the Tokio clock.
    Delay(std::time::Duration, T),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

type HistoryKey = (String, SnapshotCategory);

/// One recorded history call.
#[derive(Debug, Clone)]
pub struct HistoryCall {
    /// Requested instrument.
    pub instrument: String,
    /// Requested category.
    pub category: SnapshotCategory,
    /// Tokio instant at which the call started.
    pub at: Instant,
}

#[derive(Default)]
struct InternalState {
    history_rules: HashMap<HistoryKey, MockBehavior<Option<HistoricalSnapshot>>>,
    market_rule: Option<MockBehavior<MarketPayload>>,
    refresh_rule: Option<MockBehavior<()>>,
    history_calls: HashMap<HistoryKey, u32>,
    history_log: Vec<HistoryCall>,
    market_calls: u32,
    refresh_calls: u32,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior for history calls of one (instrument, category).
    pub async fn set_history_behavior(
        &self,
        instrument: &str,
        category: SnapshotCategory,
        behavior: MockBehavior<Option<HistoricalSnapshot>>,
    ) {
        let mut guard = self.state.lock().await;
        guard
            .history_rules
            .insert((instrument.to_string(), category), behavior);
    }

    /// Set the behavior for market-data calls.
    pub async fn set_market_data_behavior(&self, behavior: MockBehavior<MarketPayload>) {
        self.state.lock().await.market_rule = Some(behavior);
    }

    /// Set the behavior for force-refresh calls.
    pub async fn set_refresh_behavior(&self, behavior: MockBehavior<()>) {
        self.state.lock().await.refresh_rule = Some(behavior);
    }

    /// Number of history calls made for one (instrument, category).
    pub async fn history_calls(&self, instrument: &str, category: SnapshotCategory) -> u32 {
        let guard = self.state.lock().await;
        guard
            .history_calls
            .get(&(instrument.to_string(), category))
            .copied()
            .unwrap_or(0)
    }

    /// Every history call in the order it started.
    pub async fn history_log(&self) -> Vec<HistoryCall> {
        self.state.lock().await.history_log.clone()
    }

    /// Number of market-data calls made.
    pub async fn market_data_calls(&self) -> u32 {
        self.state.lock().await.market_calls
    }

    /// Number of force-refresh calls made.
    pub async fn refresh_calls(&self) -> u32 {
        self.state.lock().await.refresh_calls
    }

    /// Clear all configured behaviors and call logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        *guard = InternalState::default();
    }
}

/// A connector that defers all behavior to an external controller.
///
/// History calls without a configured rule answer with no record. Market-data
/// and refresh calls without a rule fail as unsupported.
pub struct DynamicMockConnector {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockConnector {
    /// Create a new dynamic mock connector and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn PregaoConnector>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn PregaoConnector>, controller)
    }

    async fn run<T>(
        &self,
        behavior: Option<MockBehavior<T>>,
        call_number: u32,
        capability: &'static str,
    ) -> Result<T, PregaoError> {
        match behavior {
            Some(MockBehavior::Return(v)) => Ok(v),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::FailTimes(n, v)) => {
                if call_number <= n {
                    Err(PregaoError::connector(
                        self.name,
                        format!("forced failure {call_number}/{n}: {capability}"),
                    ))
                } else {
                    Ok(v)
                }
            }
            Some(MockBehavior::Delay(d, v)) => {
                tokio::time::sleep(d).await;
                Ok(v)
            }
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(PregaoError::unsupported(capability)),
        }
    }
}

impl PregaoConnector for DynamicMockConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "DynamicMock"
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
impl HistoryProvider for DynamicMockConnector {
    async fn latest_snapshot(
        &self,
        req: &HistoryRequest,
    ) -> Result<Option<HistoricalSnapshot>, PregaoError> {
        let key = (req.instrument.clone(), req.category);
        // Snapshot the behavior without holding the lock across await points
        let (behavior, call_number) = {
            let mut guard = self.state.lock().await;
            guard.history_log.push(HistoryCall {
                instrument: req.instrument.clone(),
                category: req.category,
                at: Instant::now(),
            });
            let calls = guard.history_calls.entry(key.clone()).or_insert(0);
            *calls += 1;
            let n = *calls;
            (guard.history_rules.get(&key).cloned(), n)
        };
        match behavior {
            None => Ok(None),
            some => self.run(some, call_number, "history").await,
        }
    }
}

#[async_trait]
impl MarketDataProvider for DynamicMockConnector {
    async fn market_data(&self) -> Result<MarketPayload, PregaoError> {
        let (behavior, call_number) = {
            let mut guard = self.state.lock().await;
            guard.market_calls += 1;
            (guard.market_rule.clone(), guard.market_calls)
        };
        self.run(behavior, call_number, "market-data").await
    }
}

#[async_trait]
impl RefreshProvider for DynamicMockConnector {
    async fn force_refresh(&self) -> Result<(), PregaoError> {
        let (behavior, call_number) = {
            let mut guard = self.state.lock().await;
            guard.refresh_calls += 1;
            (guard.refresh_rule.clone(), guard.refresh_calls)
        };
        self.run(behavior, call_number, "refresh").await
    }
}
