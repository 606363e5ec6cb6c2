//! A retry decorator for [`messaging_contracts::Handler`]: wraps an inner
//! handler and keeps re-invoking it against the same batch until it
//! succeeds, a bounded retry budget is exhausted, or the caller cancels.
//!
//! Grounded on the upstream Go `handlers/retry` package, with the backoff
//! calculation taken from `resilience::retry` and the panic-as-signal
//! failure mode replaced by an explicit `Result` per spec.md §9.

mod config;
mod error;
mod handler;
mod monitor;

pub use config::RetryConfig;
pub use error::RetryFailure;
pub use handler::{ImmediateRetryPredicate, RetryHandler};
pub use monitor::{Monitor, NopMonitor, TracingMonitor};
