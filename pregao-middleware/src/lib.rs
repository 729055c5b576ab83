//! pregao-middleware
//!
//! Re-exports for middleware wrappers and stores.

mod builder;
mod retry;
mod store;

pub use crate::builder::ConnectorBuilder;
pub use crate::retry::{RetryMiddleware, RetryingConnector, call_with_retry, jitter_wait};
pub use crate::store::BoundedStore;
