//! Retry wrapper with per-attempt timeouts.
//!
//! Every call to a wrapped capability is bounded by the capability's timeout
//! and retried on transient failures according to a [`RetryPolicy`]. Errors
//! that retrying cannot fix (bad payloads, missing capabilities) are returned
//! after the first attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pregao_core::connector::{
    HistoryProvider, MarketDataProvider, PregaoConnector, RefreshProvider,
};
use pregao_core::{HistoricalSnapshot, HistoryRequest, MarketPayload, Middleware, PregaoError};
use pregao_types::config::{RequestTimeouts, RetryPolicy};
use rand::Rng;
use serde_json::json;

/// Add up to `jitter_percent` of `base` as random extra delay.
#[must_use]
pub fn jitter_wait(base: Duration, jitter_percent: u8) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, base_ms.saturating_mul(u64::from(jitter_percent)) / 100)
    };
    let mut rng = rand::rng();
    Duration::from_millis(base_ms.saturating_add(rng.random_range(0..jitter_range)))
}

/// Run `op` under `policy`, bounding each attempt by `timeout`.
///
/// # Errors
/// Returns the first non-transient error as-is, or `RetriesExhausted` wrapping
/// the final error when every allowed attempt failed transiently.
pub async fn call_with_retry<T, F, Fut>(
    connector: &'static str,
    capability: &'static str,
    policy: &RetryPolicy,
    timeout: Duration,
    mut op: F,
) -> Result<T, PregaoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PregaoError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = (tokio::time::timeout(timeout, op()).await)
            .unwrap_or_else(|_| Err(PregaoError::provider_timeout(connector, capability)));
        let err = match result {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if !err.is_transient() {
            return Err(err);
        }
        if attempt >= max_attempts {
            if max_attempts == 1 {
                return Err(err);
            }
            return Err(PregaoError::RetriesExhausted {
                capability: capability.to_string(),
                attempts: attempt,
                last: Box::new(err),
            });
        }
        let delay = jitter_wait(policy.base_delay(attempt), policy.jitter_percent);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            connector,
            capability,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "retrying after transient failure"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Connector wrapper that applies [`call_with_retry`] to every capability.
pub struct RetryingConnector {
    inner: Arc<dyn PregaoConnector>,
    policy: RetryPolicy,
    timeouts: RequestTimeouts,
}

impl RetryingConnector {
    /// Wrap `inner` with the given policy and timeouts.
    pub fn new(inner: Arc<dyn PregaoConnector>, policy: RetryPolicy, timeouts: RequestTimeouts) -> Self {
        Self {
            inner,
            policy,
            timeouts,
        }
    }

    /// Access the inner connector.
    pub fn inner(&self) -> &Arc<dyn PregaoConnector> {
        &self.inner
    }

    /// Retry policy in effect.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl PregaoConnector for RetryingConnector {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn vendor(&self) -> &'static str {
        self.inner.vendor()
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        self.inner
            .as_history_provider()
            .map(|_| self as &dyn HistoryProvider)
    }

    fn as_market_data_provider(&self) -> Option<&dyn MarketDataProvider> {
        self.inner
            .as_market_data_provider()
            .map(|_| self as &dyn MarketDataProvider)
    }

    fn as_refresh_provider(&self) -> Option<&dyn RefreshProvider> {
        self.inner
            .as_refresh_provider()
            .map(|_| self as &dyn RefreshProvider)
    }
}

#[async_trait]
impl HistoryProvider for RetryingConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "pregao::middleware::retry::history",
            skip(self, req),
            fields(instrument = %req.instrument, category = %req.category),
        )
    )]
    async fn latest_snapshot(
        &self,
        req: &HistoryRequest,
    ) -> Result<Option<HistoricalSnapshot>, PregaoError> {
        let inner = self
            .inner
            .as_history_provider()
            .ok_or_else(|| PregaoError::unsupported("history"))?;
        call_with_retry(
            self.inner.name(),
            "history",
            &self.policy,
            self.timeouts.history,
            || inner.latest_snapshot(req),
        )
        .await
    }
}

#[async_trait]
impl MarketDataProvider for RetryingConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pregao::middleware::retry::market_data", skip(self))
    )]
    async fn market_data(&self) -> Result<MarketPayload, PregaoError> {
        let inner = self
            .inner
            .as_market_data_provider()
            .ok_or_else(|| PregaoError::unsupported("market-data"))?;
        call_with_retry(
            self.inner.name(),
            "market-data",
            &self.policy,
            self.timeouts.market_data,
            || inner.market_data(),
        )
        .await
    }
}

#[async_trait]
impl RefreshProvider for RetryingConnector {
    async fn force_refresh(&self) -> Result<(), PregaoError> {
        let inner = self
            .inner
            .as_refresh_provider()
            .ok_or_else(|| PregaoError::unsupported("refresh"))?;
        call_with_retry(
            self.inner.name(),
            "refresh",
            &self.policy,
            self.timeouts.refresh,
            || inner.force_refresh(),
        )
        .await
    }
}

/// Middleware config for constructing a [`RetryingConnector`].
pub struct RetryMiddleware {
    pub policy: RetryPolicy,
    pub timeouts: RequestTimeouts,
}

impl RetryMiddleware {
    #[must_use]
    pub const fn new(policy: RetryPolicy, timeouts: RequestTimeouts) -> Self {
        Self { policy, timeouts }
    }
}

impl Middleware for RetryMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn PregaoConnector>) -> Arc<dyn PregaoConnector> {
        Arc::new(RetryingConnector::new(inner, self.policy, self.timeouts))
    }

    fn name(&self) -> &'static str {
        "RetryingConnector"
    }

    fn config_json(&self) -> serde_json::Value {
        json!({
            "max_attempts": self.policy.max_attempts,
            "backoff": self.policy.backoff,
            "jitter_percent": self.policy.jitter_percent,
            "history_timeout_ms": u64::try_from(self.timeouts.history.as_millis()).unwrap_or(u64::MAX),
            "market_data_timeout_ms": u64::try_from(self.timeouts.market_data.as_millis()).unwrap_or(u64::MAX),
            "refresh_timeout_ms": u64::try_from(self.timeouts.refresh.as_millis()).unwrap_or(u64::MAX),
        })
    }
}
