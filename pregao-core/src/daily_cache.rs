//! Day-scoped, timezone-gated persistence of the cacheable aggregates.
//!
//! Each cacheable kind has an authoritative window on the wall clock of its
//! reference timezone. Inside the window the realtime aggregate is persisted
//! under today's key and served; outside it persisted entries win over
//! realtime values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pregao_types::{
    AggregateKind, AggregateTotals, CacheKind, DailyCacheEntry, Provenance, ServedAggregate,
    WindowConfig,
};

use crate::persistence::KeyValueStore;
use crate::time::{WallClock, parse_opt, wall_clock};

/// Position of an instant relative to a kind's authoritative window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// Before the window opens on the local day.
    PreWindow,
    /// Inside the window.
    InWindow,
    /// After the window closed on the local day (after-hours only).
    PostWindow,
}

/// Cache of the close-of-day and after-hours aggregates.
pub struct DailyWindowCache {
    store: Arc<dyn KeyValueStore>,
    windows: WindowConfig,
    key_prefix: Option<String>,
}

impl std::fmt::Debug for DailyWindowCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyWindowCache")
            .field("windows", &self.windows)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl DailyWindowCache {
    /// Create a cache over `store` with the given window policies.
    pub fn new(store: Arc<dyn KeyValueStore>, windows: WindowConfig) -> Self {
        Self {
            store,
            windows,
            key_prefix: None,
        }
    }

    /// Namespace every persisted key with `prefix`.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: Option<String>) -> Self {
        self.key_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    /// Window policies in effect.
    #[must_use]
    pub const fn windows(&self) -> &WindowConfig {
        &self.windows
    }

    /// Wall clock of `kind`'s reference timezone at `now`.
    #[must_use]
    pub fn wall_clock(&self, kind: CacheKind, now: DateTime<Utc>) -> WallClock {
        let tz = match kind {
            CacheKind::CloseOfDay => self.windows.close_of_day.timezone,
            CacheKind::AfterHours => self.windows.after_hours.timezone,
        };
        wall_clock(now, tz)
    }

    /// Phase of `kind`'s window at `now`.
    #[must_use]
    pub fn phase(&self, kind: CacheKind, now: DateTime<Utc>) -> WindowPhase {
        let hour = self.wall_clock(kind, now).hour;
        match kind {
            CacheKind::CloseOfDay => {
                if hour >= self.windows.close_of_day.open_hour {
                    WindowPhase::InWindow
                } else {
                    WindowPhase::PreWindow
                }
            }
            CacheKind::AfterHours => {
                let w = &self.windows.after_hours;
                if hour < w.start_hour {
                    WindowPhase::PreWindow
                } else if hour < w.end_hour {
                    WindowPhase::InWindow
                } else {
                    WindowPhase::PostWindow
                }
            }
        }
    }

    /// Persisted key for `kind` on `day_key`.
    #[must_use]
    pub fn key(&self, kind: CacheKind, day_key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{}:{day_key}", kind.as_str()),
            None => format!("{}:{day_key}", kind.as_str()),
        }
    }

    /// Read the entry persisted for `kind` on `day_key`.
    ///
    /// Read failures and undecodable entries are reported as absent.
    #[must_use]
    pub fn read(&self, kind: CacheKind, day_key: &str) -> Option<DailyCacheEntry> {
        let key = self.key(kind, day_key);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key = %key, error = %_e, "daily cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<DailyCacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key = %key, error = %_e, "ignoring undecodable daily cache entry");
                None
            }
        }
    }

    /// Persist `entry` for `kind` on `day_key`. Failures are logged and dropped.
    pub fn write(&self, kind: CacheKind, day_key: &str, entry: &DailyCacheEntry) {
        let key = self.key(kind, day_key);
        let result = serde_json::to_string(entry)
            .map_err(crate::PregaoError::storage)
            .and_then(|raw| self.store.set(&key, &raw));
        match result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, total = entry.totals.total, "daily cache written");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key = %key, error = %_e, "daily cache write failed");
            }
        }
    }

    /// Decide what to serve for `kind` at `now`.
    ///
    /// `realtime` is the aggregate computed from the current snapshot store and
    /// `resolve_ts` yields its data timestamp; it is only called when the
    /// realtime value is served or persisted.
    pub fn serve<F>(
        &self,
        kind: CacheKind,
        now: DateTime<Utc>,
        realtime: Option<AggregateTotals>,
        resolve_ts: F,
    ) -> ServedAggregate
    where
        F: FnOnce() -> Option<DateTime<Utc>>,
    {
        let clock = self.wall_clock(kind, now);
        let today = clock.day_key.as_str();
        let phase = self.phase(kind, now);

        if phase == WindowPhase::InWindow {
            if let Some(totals) = realtime {
                let timestamp = resolve_ts();
                let entry = DailyCacheEntry {
                    totals,
                    timestamp: timestamp.map(|t| t.to_rfc3339()),
                };
                self.write(kind, today, &entry);
                return ServedAggregate::realtime(kind.into(), Some(totals), timestamp);
            }
            return self.cached(kind, today, Provenance::CachedToday);
        }

        match kind {
            CacheKind::CloseOfDay => {
                let yesterday = clock.previous_day_key();
                let persisted = self
                    .read(kind, &yesterday)
                    .map(|e| (e, Provenance::CachedYesterday))
                    .or_else(|| self.read(kind, today).map(|e| (e, Provenance::CachedToday)));
                if let Some((entry, provenance)) = persisted {
                    return from_entry(kind.into(), entry, provenance);
                }
                match realtime {
                    Some(totals) if self.windows.close_of_day.provisional_pre_window => {
                        provisional(kind.into(), totals, resolve_ts())
                    }
                    _ => ServedAggregate::no_data(kind.into()),
                }
            }
            CacheKind::AfterHours => {
                if let Some(entry) = self.read(kind, today) {
                    return from_entry(kind.into(), entry, Provenance::CachedToday);
                }
                match realtime {
                    Some(totals) => provisional(kind.into(), totals, resolve_ts()),
                    None => ServedAggregate::no_data(kind.into()),
                }
            }
        }
    }

    fn cached(&self, kind: CacheKind, day_key: &str, provenance: Provenance) -> ServedAggregate {
        self.read(kind, day_key).map_or_else(
            || ServedAggregate::no_data(kind.into()),
            |entry| from_entry(kind.into(), entry, provenance),
        )
    }
}

fn from_entry(kind: AggregateKind, entry: DailyCacheEntry, provenance: Provenance) -> ServedAggregate {
    ServedAggregate {
        kind,
        totals: Some(entry.totals),
        timestamp: parse_opt(entry.timestamp.as_deref()),
        provenance,
        provisional: false,
    }
}

fn provisional(
    kind: AggregateKind,
    totals: AggregateTotals,
    timestamp: Option<DateTime<Utc>>,
) -> ServedAggregate {
    ServedAggregate {
        provisional: true,
        ..ServedAggregate::realtime(kind, Some(totals), timestamp)
    }
}
