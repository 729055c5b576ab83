//! Refresh cycle: backfill once, poke the backend, fetch and apply a payload.

use std::sync::atomic::{AtomicBool, Ordering};

use pregao_core::{PregaoError, RefreshReport, RefreshStatus};
use tokio::time::Instant;

use crate::core::Engine;

/// Clears the in-flight flag when the cycle ends, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Engine {
    /// Run one refresh cycle.
    ///
    /// Transport and payload failures are reported through the returned
    /// [`RefreshReport`], never as `Err`.
    ///
    /// # Errors
    /// Returns `RefreshInProgress` when another cycle is still running.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pregao::refresh", skip(self))
    )]
    pub async fn refresh(&self) -> Result<RefreshReport, PregaoError> {
        let Some(_in_flight) = InFlight::acquire(&self.refreshing) else {
            #[cfg(feature = "tracing")]
            tracing::debug!("refresh already in progress; ignoring");
            return Err(PregaoError::RefreshInProgress);
        };
        let started = Instant::now();
        let mut warnings = Vec::new();

        let ingestion = if self.is_loaded() {
            None
        } else {
            Some(self.backfill().await)
        };

        if self.cfg.refresh.force_backend_refresh
            && let Some(provider) = self.connector.as_refresh_provider()
            && let Err(e) = provider.force_refresh().await
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "backend refresh failed; continuing with cached data");
            warnings.push(e);
        }

        let fetched = match self.connector.as_market_data_provider() {
            Some(provider) => provider.market_data().await,
            None => Err(PregaoError::unsupported("market-data")),
        };

        let (status, widgets) = match fetched {
            Ok(payload) => (RefreshStatus::Success, Some(self.apply_payload(&payload).await)),
            Err(e) => {
                let status = if matches!(e.root_cause(), PregaoError::Data(_)) {
                    RefreshStatus::InvalidPayload
                } else {
                    RefreshStatus::ConnectionError
                };
                #[cfg(feature = "tracing")]
                tracing::error!(error = %e, ?status, "market data fetch failed");
                warnings.push(e);
                (status, None)
            }
        };

        let report = RefreshReport {
            status,
            duration_ms: millis(started.elapsed()),
            ingestion,
            widgets,
            warnings,
        };
        #[cfg(feature = "tracing")]
        tracing::info!(status = ?report.status, duration_ms = report.duration_ms, "refresh finished");
        Ok(report)
    }

    /// Run a refresh cycle on behalf of an external trigger (e.g. a button).
    ///
    /// Triggers arriving within the debounce window of the previous accepted
    /// trigger are rejected without touching the connector.
    ///
    /// # Errors
    /// Returns `Debounced` inside the cool-down window, or `RefreshInProgress`
    /// when a cycle is already running.
    pub async fn request_refresh(&self) -> Result<RefreshReport, PregaoError> {
        {
            let mut last = self.last_trigger.lock().await;
            let now = Instant::now();
            let debounce = self.cfg.refresh.debounce;
            if let Some(prev) = *last {
                let elapsed = now.saturating_duration_since(prev);
                if elapsed < debounce {
                    return Err(PregaoError::Debounced {
                        retry_in_ms: millis(debounce - elapsed),
                    });
                }
            }
            *last = Some(now);
        }
        self.refresh().await
    }
}
