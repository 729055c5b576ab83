//! Builder for composing connectors with middleware layers.
//!
//! Layers form an onion around the raw connector. The `layers` vector stores
//! middleware outermost-first (last added = outermost) and `build()` applies
//! them in reverse so that `layers[0]` ends up wrapping everything else:
//!
//! ```text
//! builder.with_retry(..).layer(custom)
//!
//! Storage: [Custom, Retry]
//! Applied: Raw -> Retry -> Custom
//! Result:  Custom(Retry(Raw))
//! ```

use std::sync::Arc;

use pregao_core::Middleware;
use pregao_core::connector::PregaoConnector;
use pregao_types::config::{RequestTimeouts, RetryPolicy};
use serde_json::json;

use crate::retry::RetryMiddleware;

const RETRY: &str = "RetryingConnector";

/// Generic middleware builder for composing a connector with layered wrappers.
pub struct ConnectorBuilder {
    raw: Arc<dyn PregaoConnector>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn Middleware>>,
}

impl ConnectorBuilder {
    /// Create a new builder from a raw, unwrapped connector.
    #[must_use]
    pub fn new(raw: Arc<dyn PregaoConnector>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Add or replace the retry layer.
    ///
    /// The retry layer is inserted at the outermost position. Any previous
    /// retry layer is removed first.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy, timeouts: RequestTimeouts) -> Self {
        self.layers.retain(|m| m.name() != RETRY);
        self.layers
            .insert(0, Box::new(RetryMiddleware::new(policy, timeouts)));
        self
    }

    /// Remove the retry layer if present.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.layers.retain(|m| m.name() != RETRY);
        self
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Describe the stack outermost-first, with the raw connector last.
    #[must_use]
    pub fn describe(&self) -> Vec<(&'static str, serde_json::Value)> {
        self.layers
            .iter()
            .map(|l| (l.name(), l.config_json()))
            .chain(std::iter::once((
                "RawConnector",
                json!({ "name": self.raw.name() }),
            )))
            .collect()
    }

    /// Build the wrapped connector.
    #[must_use]
    pub fn build(self) -> Arc<dyn PregaoConnector> {
        let mut acc: Arc<dyn PregaoConnector> = Arc::clone(&self.raw);
        // Innermost first
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
