//! pregao-core
//!
//! Core traits and state shared across the pregao workspace.
//!
//! - `connector`: the `PregaoConnector` trait and capability provider traits.
//! - `store` / `merge`: the snapshot store and the freshness rule that guards it.
//! - `aggregate`: variation totals and timestamp resolvers.
//! - `daily_cache`: the timezone-gated persistence policy for cacheable widgets.
//! - `persistence`: the key-value store seam and its in-process implementations.
#![warn(missing_docs)]

/// Variation aggregates, selectors and timestamp resolvers.
pub mod aggregate;
/// Connector capability traits and the primary `PregaoConnector` interface.
pub mod connector;
/// Daily window cache for the close-of-day and after-hours aggregates.
pub mod daily_cache;
/// Freshness merger.
pub mod merge;
/// Middleware trait implemented by connector wrappers.
pub mod middleware;
/// Key-value persistence.
pub mod persistence;
/// Snapshot store.
pub mod store;
/// Wall-clock and timestamp parsing helpers.
pub mod time;

pub use aggregate::{InstrumentSource, aggregate as aggregate_variations, contributing_timestamp};
pub use connector::{HistoryProvider, MarketDataProvider, PregaoConnector, RefreshProvider};
pub use daily_cache::{DailyWindowCache, WindowPhase};
pub use merge::{merge_historical, merge_live_snapshots};
pub use middleware::Middleware;
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use store::SnapshotStore;
pub use time::{Clock, SystemClock, WallClock, parse_timestamp, wall_clock};

pub use pregao_types::*;
