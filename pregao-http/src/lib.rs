//! pregao-http
//!
//! Connector that implements `PregaoConnector` on top of the dashboard
//! backend's JSON endpoints:
//!
//! - `GET {base}/adr-history?ticker=T&type=closing|after_hours&limit=N`
//! - `GET {base}/market-data`
//! - `GET {base}/update`
//!
//! Retries and per-attempt timeouts are not applied here; wrap the connector
//! with `pregao-middleware` for that.
#![warn(missing_docs)]

mod wire;

use async_trait::async_trait;
use pregao_core::connector::{
    HistoryProvider, MarketDataProvider, PregaoConnector, RefreshProvider,
};
use pregao_core::{HistoricalSnapshot, HistoryRequest, MarketPayload, PregaoError};
use serde::de::DeserializeOwned;
use url::Url;

use crate::wire::{Envelope, HistoryRecord, MarketData};

const NAME: &str = "pregao-http";

/// Connector for the dashboard backend.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    base: Url,
}

impl HttpConnector {
    /// Build a connector for `base_url` with a default HTTP client.
    ///
    /// # Errors
    /// Returns `PregaoError::InvalidArg` when `base_url` is not an absolute URL,
    /// or `PregaoError::Other` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, PregaoError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pregao/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PregaoError::Other(format!("http client: {e}")))?;
        Self::with_client(client, base_url)
    }

    /// Build a connector reusing an existing `reqwest::Client`.
    ///
    /// # Errors
    /// Returns `PregaoError::InvalidArg` when `base_url` is not an absolute URL.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, PregaoError> {
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw)
            .map_err(|e| PregaoError::InvalidArg(format!("base url '{base_url}': {e}")))?;
        Ok(Self { client, base })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, PregaoError> {
        self.base
            .join(path)
            .map_err(|e| PregaoError::InvalidArg(format!("endpoint '{path}': {e}")))
    }

    async fn get(&self, url: Url, what: &str) -> Result<reqwest::Response, PregaoError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PregaoError::connector(NAME, format!("{what}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PregaoError::connector(NAME, format!("{what}: HTTP {status}")));
        }
        Ok(resp)
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
    ) -> Result<Envelope<T>, PregaoError> {
        let body = self
            .get(url, what)
            .await?
            .text()
            .await
            .map_err(|e| PregaoError::connector(NAME, format!("{what}: {e}")))?;
        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| PregaoError::Data(format!("{what}: invalid json: {e}")))?;
        if !envelope.is_success() {
            return Err(PregaoError::Data(format!(
                "{what}: status={} {}",
                envelope.status.as_deref().unwrap_or("missing"),
                envelope.message.as_deref().unwrap_or_default()
            )));
        }
        Ok(envelope)
    }
}

impl PregaoConnector for HttpConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn vendor(&self) -> &'static str {
        "Dashboard backend"
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
impl HistoryProvider for HttpConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "pregao_http::history",
            skip(self, req),
            fields(instrument = %req.instrument, category = %req.category),
        )
    )]
    async fn latest_snapshot(
        &self,
        req: &HistoryRequest,
    ) -> Result<Option<HistoricalSnapshot>, PregaoError> {
        let mut url = self.endpoint("adr-history")?;
        url.query_pairs_mut()
            .append_pair("ticker", &req.instrument)
            .append_pair("type", req.category.as_str())
            .append_pair("limit", &req.limit.max(1).to_string());
        let envelope: Envelope<Vec<HistoryRecord>> = self.get_envelope(url, "adr-history").await?;
        Ok(envelope
            .data
            .and_then(|records| records.into_iter().next())
            .map(|r| r.into_snapshot(req)))
    }
}

#[async_trait]
impl MarketDataProvider for HttpConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "pregao_http::market_data", skip(self))
    )]
    async fn market_data(&self) -> Result<MarketPayload, PregaoError> {
        let url = self.endpoint("market-data")?;
        let envelope: Envelope<MarketData> = self.get_envelope(url, "market-data").await?;
        let data = envelope
            .data
            .ok_or_else(|| PregaoError::Data("market-data: missing data".into()))?;
        Ok(data.into_payload(envelope.timestamp))
    }
}

#[async_trait]
impl RefreshProvider for HttpConnector {
    async fn force_refresh(&self) -> Result<(), PregaoError> {
        let url = self.endpoint("update")?;
        self.get(url, "update").await.map(|_| ())
    }
}
