use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the pregao workspace.
///
/// Transient I/O failures, payload issues and storage faults all funnel through
/// this type. None of them is fatal to the engine: the worst outcome is a stale
/// or absent aggregate.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PregaoError {
    /// The requested capability is not implemented by the target connector.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// A capability string describing what was requested (e.g. "history").
        capability: String,
    },

    /// Issues with the returned or expected data (missing fields, bad envelope).
    #[error("data issue: {0}")]
    Data(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// An individual connector returned an error.
    #[error("{connector} failed: {msg}")]
    Connector {
        /// Connector name that failed.
        connector: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A single provider call exceeded its configured timeout.
    #[error("provider timed out: {capability} via {connector}")]
    ProviderTimeout {
        /// Connector name that timed out.
        connector: String,
        /// Capability label (e.g. "history", "market-data", "refresh").
        capability: String,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("{capability} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Capability label of the retried call.
        capability: String,
        /// Number of attempts that were made.
        attempts: u32,
        /// The error returned by the final attempt.
        last: Box<PregaoError>,
    },

    /// The persistence layer rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// A refresh cycle is already running.
    #[error("refresh already in progress")]
    RefreshInProgress,

    /// An externally triggered refresh arrived inside the debounce window.
    #[error("refresh debounced: retry in {retry_in_ms}ms")]
    Debounced {
        /// Milliseconds until the debounce window elapses.
        retry_in_ms: u64,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl PregaoError {
    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub fn unsupported(cap: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: cap.into(),
        }
    }

    /// Helper: build a `Connector` error with the connector name and message.
    pub fn connector(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connector {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(connector: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            connector: connector.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build a `Storage` error from any displayable cause.
    pub fn storage(cause: impl std::fmt::Display) -> Self {
        Self::Storage(cause.to_string())
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Timeouts and connector (network/HTTP) failures are transient. Capability
    /// absence, argument errors and malformed payloads are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderTimeout { .. } | Self::Connector { .. } | Self::Other(_) => true,
            Self::RetriesExhausted { last, .. } => last.is_transient(),
            _ => false,
        }
    }

    /// Unwrap `RetriesExhausted` layers down to the error of the final attempt.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}
