use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use pregao_core::connector::PregaoConnector;
use pregao_core::{
    Clock, DailyWindowCache, EngineConfig, IngestionConfig, KeyValueStore, MemoryStore,
    PregaoError, RequestTimeouts, RetryPolicy, SnapshotStore, SystemClock, WindowConfig,
};
use pregao_middleware::ConnectorBuilder;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Aggregation engine for one dashboard session.
///
/// Owns the snapshot store, the daily window cache and the refresh state. All
/// methods take `&self`; share the engine behind an `Arc` to drive it from
/// several tasks.
pub struct Engine {
    pub(crate) connector: Arc<dyn PregaoConnector>,
    pub(crate) cfg: EngineConfig,
    pub(crate) store: Mutex<SnapshotStore>,
    pub(crate) cache: DailyWindowCache,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) loaded: AtomicBool,
    pub(crate) refreshing: AtomicBool,
    pub(crate) last_trigger: Mutex<Option<Instant>>,
}

/// Builder for constructing an [`Engine`] with custom configuration.
pub struct EngineBuilder {
    connector: Option<Arc<dyn PregaoConnector>>,
    cfg: EngineConfig,
    kv: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    wrap_with_retry: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Create a new builder with the default configuration.
    ///
    /// Defaults: the eight tracked ADRs, `BRENT`/`WTI`/`IRON` as commodities,
    /// batches of 4 with 200 ms pacing, 3 attempts with linear 1 s backoff,
    /// an in-memory key-value store and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connector: None,
            cfg: EngineConfig::default(),
            kv: None,
            clock: None,
            wrap_with_retry: true,
        }
    }

    /// Set the data source.
    ///
    /// The connector is wrapped with the retry middleware at build time unless
    /// [`without_retry_middleware`](Self::without_retry_middleware) is called.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn PregaoConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Instruments aggregated by the ADR widgets.
    #[must_use]
    pub fn tracked_instruments<I, S>(mut self, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.tracked_instruments = instruments.into_iter().map(Into::into).collect();
        self
    }

    /// Instruments aggregated by the commodities widget.
    #[must_use]
    pub fn commodity_instruments<I, S>(mut self, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.commodity_instruments = instruments.into_iter().map(Into::into).collect();
        self
    }

    /// Batch size, pacing and history limit of the backfill queue.
    #[must_use]
    pub const fn ingestion(mut self, ingestion: IngestionConfig) -> Self {
        self.cfg.ingestion = ingestion;
        self
    }

    /// Retry policy applied to every connector call.
    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.cfg.retry = policy;
        self
    }

    /// Per-attempt timeouts.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.cfg.timeouts = timeouts;
        self
    }

    /// Window policies of the cacheable widgets.
    #[must_use]
    pub const fn windows(mut self, windows: WindowConfig) -> Self {
        self.cfg.windows = windows;
        self
    }

    /// Cool-down applied to externally triggered refreshes.
    #[must_use]
    pub const fn debounce(mut self, debounce: Duration) -> Self {
        self.cfg.refresh.debounce = debounce;
        self
    }

    /// Persistence backend of the daily window cache.
    #[must_use]
    pub fn key_value_store(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Source of the current instant used by the window policies.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use the connector as-is, without retries or per-attempt timeouts.
    #[must_use]
    pub const fn without_retry_middleware(mut self) -> Self {
        self.wrap_with_retry = false;
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no connector was set, the batch size or attempt
    /// count is zero, or a window hour is out of range.
    pub fn build(self) -> Result<Engine, PregaoError> {
        let Some(raw) = self.connector else {
            return Err(PregaoError::InvalidArg(
                "no connector registered; add one via with_connector(...)".to_string(),
            ));
        };
        validate(&self.cfg)?;

        let connector = if self.wrap_with_retry {
            ConnectorBuilder::new(raw)
                .with_retry(self.cfg.retry, self.cfg.timeouts)
                .build()
        } else {
            raw
        };
        let kv = self.kv.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let cache = DailyWindowCache::new(kv, self.cfg.windows)
            .with_key_prefix(self.cfg.cache_key_prefix.clone());

        Ok(Engine {
            connector,
            cache,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            store: Mutex::new(SnapshotStore::new()),
            loaded: AtomicBool::new(false),
            refreshing: AtomicBool::new(false),
            last_trigger: Mutex::new(None),
            cfg: self.cfg,
        })
    }
}

fn validate(cfg: &EngineConfig) -> Result<(), PregaoError> {
    if cfg.ingestion.batch_size == 0 {
        return Err(PregaoError::InvalidArg("ingestion.batch_size must be > 0".into()));
    }
    if cfg.retry.max_attempts == 0 {
        return Err(PregaoError::InvalidArg("retry.max_attempts must be > 0".into()));
    }
    if cfg.windows.close_of_day.open_hour > 23 {
        return Err(PregaoError::InvalidArg(
            "windows.close_of_day.open_hour must be in 0..=23".into(),
        ));
    }
    let ah = &cfg.windows.after_hours;
    if ah.start_hour >= ah.end_hour || ah.end_hour > 24 {
        return Err(PregaoError::InvalidArg(format!(
            "windows.after_hours must satisfy start_hour < end_hour <= 24 (got {}..{})",
            ah.start_hour, ah.end_hour
        )));
    }
    Ok(())
}

impl Engine {
    /// Start building a new engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// The (possibly middleware-wrapped) connector in use.
    #[must_use]
    pub fn connector(&self) -> &Arc<dyn PregaoConnector> {
        &self.connector
    }

    /// The daily window cache.
    #[must_use]
    pub const fn daily_cache(&self) -> &DailyWindowCache {
        &self.cache
    }

    /// True once the snapshot backfill has run this session.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Copy of the current snapshot store.
    pub async fn snapshot_store(&self) -> SnapshotStore {
        self.store.lock().await.clone()
    }
}
