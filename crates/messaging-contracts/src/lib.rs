//! Transport contracts shared across the messaging workspace: the
//! `Connector`/`Connection`/`Reader`/`Writer`/`Stream` trait family, the
//! `Delivery`/`Dispatch`/`StreamConfig` data model, the connection pool, and
//! the two-phase cancellation primitive every other crate in the workspace
//! builds on.
//!
//! Grounded on the upstream Go `contracts.go` (trait family and data model)
//! and on spec.md §9's replacement of `context.Context` with
//! [`tokio_util::sync::CancellationToken`].

pub mod encode;
pub mod error;
pub mod model;
pub mod pool;
pub mod traits;

pub use encode::{ensure_encoded, Encoder};
pub use error::TransportError;
pub use model::{Delivery, Dispatch, Headers, OpaqueMessage, StreamConfig};
pub use pool::ConnectionPool;
pub use traits::{
    Connection, CommitWriter, Connector, Handler, ListenCloser, Listener, Reader, Stream,
    TransportResult, Writer,
};

/// Re-exported so downstream crates depend on one name for the cancellation
/// primitive rather than pulling `tokio-util` directly.
pub type CancellationToken = tokio_util::sync::CancellationToken;

/// The soft/hard cancellation pair a [`crate`] consumer (subscriber,
/// manager) hands to its workers (spec.md §5 "Two-phase shutdown").
///
/// `soft` asks a worker to stop accepting new work and drain what it already
/// has in flight; `hard` asks it to abort immediately regardless of
/// in-flight work. A worker observes `soft` in its main select loop and
/// `hard` in everything downstream of that, including batched handler
/// dispatch.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    soft: CancellationToken,
    hard: CancellationToken,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            soft: CancellationToken::new(),
            hard: CancellationToken::new(),
        }
    }

    pub fn soft(&self) -> &CancellationToken {
        &self.soft
    }

    pub fn hard(&self) -> &CancellationToken {
        &self.hard
    }

    /// Requests a drain: stop taking new work, finish what's in flight.
    pub fn request_soft_shutdown(&self) {
        self.soft.cancel();
    }

    /// Requests an immediate abort of in-flight work as well.
    pub fn request_hard_shutdown(&self) {
        self.soft.cancel();
        self.hard.cancel();
    }

    pub fn is_soft_cancelled(&self) -> bool {
        self.soft.is_cancelled()
    }

    pub fn is_hard_cancelled(&self) -> bool {
        self.hard.is_cancelled()
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}
