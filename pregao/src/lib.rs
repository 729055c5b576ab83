//! Pregao aggregates ADR and commodity variations for a market dashboard.
//!
//! Overview
//! - Backfills the closing and after-hours snapshots of every tracked
//!   instrument through a paced, batched queue.
//! - Reconciles those snapshots with the ones embedded in each live payload,
//!   keeping the one with the later source time.
//! - Computes positive/negative/total variation sums for four widgets:
//!   current, close-of-day, after-hours and commodities.
//! - Persists the close-of-day and after-hours sums per local day and serves
//!   them according to each widget's exchange-clock window.
//!
//! Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use pregao::Engine;
//! use pregao_http::HttpConnector;
//!
//! let engine = Engine::builder()
//!     .with_connector(Arc::new(HttpConnector::new("http://localhost:8000/api")?))
//!     .build()?;
//! let report = engine.refresh().await?;
//! if let Some(widgets) = report.widgets {
//!     println!("close-of-day: {:?}", widgets.close_of_day.totals);
//! }
//! ```
#![warn(missing_docs)]

pub(crate) mod core;
mod ingest;
mod refresh;
mod widgets;

pub use crate::core::{Engine, EngineBuilder};

pub use pregao_middleware::{BoundedStore, ConnectorBuilder, RetryMiddleware, RetryingConnector};

// Re-export core types for convenience
pub use pregao_core::{
    AggregateKind, AggregateTotals, CacheKind, Clock, DailyWindowCache, EngineConfig, FileStore,
    IngestionReport, KeyValueStore, LiveQuote, MarketPayload, MemoryStore, PregaoConnector,
    PregaoError, Provenance, RefreshReport, RefreshStatus, ServedAggregate, SnapshotCategory,
    SnapshotEntry, SnapshotRef, SnapshotStore, SystemClock, WidgetSet,
};
