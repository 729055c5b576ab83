//! Pregao-specific data transfer objects, configuration primitives and errors.
#![warn(missing_docs)]

mod aggregate;
pub mod config;
mod error;
mod quote;
mod reports;
mod snapshot;

pub use aggregate::{
    AggregateKind, AggregateTotals, CacheKind, DailyCacheEntry, Provenance, ServedAggregate,
    WidgetSet,
};
pub use config::{
    AfterHoursWindow, Backoff, CloseOfDayWindow, EngineConfig, IngestionConfig, RefreshConfig,
    RequestTimeouts, RetryPolicy, WindowConfig,
};
pub use error::PregaoError;
pub use quote::{LiveQuote, MarketPayload, Series};
pub use reports::{IngestionReport, MergeOutcome, RefreshReport, RefreshStatus};
pub use snapshot::{
    AfterHoursRef, HistoricalSnapshot, HistoryRequest, SnapshotCategory, SnapshotEntry,
    SnapshotRef,
};
