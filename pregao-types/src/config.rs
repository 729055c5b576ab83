//! Configuration types shared by the engine, middleware and connectors.

use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Instruments tracked by the ADR summary widgets.
pub const DEFAULT_TRACKED: [&str; 8] = [
    "PBR", "PBR-A", "ITUB", "BBD", "BBDO", "BSBR", "VALE", "BDORY",
];

/// Instruments aggregated by the commodities widget.
pub const DEFAULT_COMMODITIES: [&str; 3] = ["BRENT", "WTI", "IRON"];

/// Delay schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Backoff {
    /// Wait `attempt * step_ms` after the n-th failed attempt.
    Linear {
        /// Delay added per failed attempt, in milliseconds.
        step_ms: u64,
    },
    /// Wait `min_ms * factor^(attempt-1)`, capped at `max_ms`.
    Exponential {
        /// Delay after the first failure, in milliseconds.
        min_ms: u64,
        /// Upper bound for any single delay, in milliseconds.
        max_ms: u64,
        /// Growth factor per failure (>= 1).
        factor: u32,
    },
}

impl Backoff {
    /// Delay in milliseconds to wait after `attempt` (1-based) has failed.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        match *self {
            Self::Linear { step_ms } => step_ms.saturating_mul(u64::from(attempt)),
            Self::Exponential {
                min_ms,
                max_ms,
                factor,
            } => {
                let exp = attempt.saturating_sub(1);
                let mult = u64::from(factor.max(1)).saturating_pow(exp);
                min_ms.saturating_mul(mult).min(max_ms)
            }
        }
    }
}

/// Bounded retry policy consumed by the retry middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (>= 1).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: Backoff,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Linear { step_ms: 0 },
            jitter_percent: 0,
        }
    }

    /// Base delay (without jitter) after `attempt` has failed.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff.delay_ms(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear { step_ms: 1_000 },
            jitter_percent: 0,
        }
    }
}

/// Per-capability timeouts applied to each individual attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTimeouts {
    /// Timeout for a single history request.
    pub history: Duration,
    /// Timeout for fetching the live market payload.
    pub market_data: Duration,
    /// Timeout for the backend force-refresh trigger.
    pub refresh: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            history: Duration::from_secs(10),
            market_data: Duration::from_secs(12),
            refresh: Duration::from_secs(12),
        }
    }
}

/// Settings for the snapshot backfill queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Number of history requests dispatched concurrently per batch.
    pub batch_size: usize,
    /// Mandatory pause between consecutive batches.
    pub pacing: Duration,
    /// Number of records requested per (instrument, category).
    pub history_limit: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            pacing: Duration::from_millis(200),
            history_limit: 1,
        }
    }
}

/// Close-of-day window: authoritative from `open_hour` until local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOfDayWindow {
    /// Reference timezone for both the gate and the day key.
    pub timezone: Tz,
    /// Local hour at which today's close becomes authoritative.
    pub open_hour: u32,
    /// Serve a realtime aggregate before the window opens when nothing is persisted.
    ///
    /// `true` applies the complete close-of-day policy: with nothing persisted
    /// for yesterday or today, the realtime value is served, flagged
    /// provisional. The default `false` shows no data until the window opens.
    pub provisional_pre_window: bool,
}

impl Default for CloseOfDayWindow {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Sao_Paulo,
            open_hour: 17,
            provisional_pre_window: false,
        }
    }
}

/// After-hours window: authoritative for local hours in `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfterHoursWindow {
    /// Reference timezone for both the gate and the day key.
    pub timezone: Tz,
    /// First local hour inside the window.
    pub start_hour: u32,
    /// First local hour after the window.
    pub end_hour: u32,
}

impl Default for AfterHoursWindow {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            start_hour: 17,
            end_hour: 21,
        }
    }
}

/// Both cacheable window policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Policy for the close-of-day widget.
    pub close_of_day: CloseOfDayWindow,
    /// Policy for the after-hours widget.
    pub after_hours: AfterHoursWindow,
}

/// Settings for the outer refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Cool-down during which externally triggered refreshes are rejected.
    pub debounce: Duration,
    /// Whether to fire the backend force-refresh trigger before each fetch.
    pub force_backend_refresh: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            force_backend_refresh: true,
        }
    }
}

/// Global configuration for the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Instruments aggregated by the current, close-of-day and after-hours widgets.
    pub tracked_instruments: Vec<String>,
    /// Instruments aggregated by the commodities widget.
    pub commodity_instruments: Vec<String>,
    /// Backfill queue settings.
    pub ingestion: IngestionConfig,
    /// Retry policy applied to every connector call.
    pub retry: RetryPolicy,
    /// Per-attempt timeouts.
    pub timeouts: RequestTimeouts,
    /// Window policies of the cacheable widgets.
    pub windows: WindowConfig,
    /// Outer refresh cycle settings.
    pub refresh: RefreshConfig,
    /// Optional namespace prepended to persisted cache keys (`{prefix}:{kind}:{day}`).
    pub cache_key_prefix: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracked_instruments: DEFAULT_TRACKED.iter().map(ToString::to_string).collect(),
            commodity_instruments: DEFAULT_COMMODITIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            ingestion: IngestionConfig::default(),
            retry: RetryPolicy::default(),
            timeouts: RequestTimeouts::default(),
            windows: WindowConfig::default(),
            refresh: RefreshConfig::default(),
            cache_key_prefix: None,
        }
    }
}
