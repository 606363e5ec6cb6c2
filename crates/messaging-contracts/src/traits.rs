//! The transport contract: `Connector` → `Connection` → `Reader`/`Writer` →
//! `Stream`/`CommitWriter`. Grounded one-to-one on the upstream Go
//! `contracts.go`; cancellation is threaded through every suspension point
//! via [`CancellationToken`] instead of `context.Context`, per spec.md §9
//! Design Notes.

use crate::error::TransportError;
use crate::model::{Delivery, Dispatch, StreamConfig};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type TransportResult<T> = Result<T, TransportError>;

/// Opens [`Connection`]s against one broker-agnostic transport. A concrete
/// implementation (RabbitMQ, Kafka, the SQL outbox transport) tracks every
/// `Connection` it has issued so that `close` can dispose all of them (see
/// spec.md §9 Design Notes: "Connector.Close tracking").
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, cancel: CancellationToken) -> TransportResult<Box<dyn Connection>>;

    /// Close every connection this connector has issued.
    async fn close(&self) -> TransportResult<()>;
}

/// A single live connection to the broker. Exclusively owned by whatever
/// borrowed it from the [`crate::pool::ConnectionPool`] for the duration of
/// its use.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn reader(&self, cancel: CancellationToken) -> TransportResult<Box<dyn Reader>>;
    async fn writer(&self, cancel: CancellationToken) -> TransportResult<Box<dyn Writer>>;
    async fn commit_writer(
        &self,
        cancel: CancellationToken,
    ) -> TransportResult<Box<dyn CommitWriter>>;
    async fn close(&self) -> TransportResult<()>;
}

/// Opens [`Stream`]s against a [`Connection`].
#[async_trait]
pub trait Reader: Send + Sync {
    async fn stream(
        &self,
        cancel: CancellationToken,
        config: StreamConfig,
    ) -> TransportResult<Box<dyn Stream>>;
    async fn close(&self) -> TransportResult<()>;
}

/// A live subscription cursor over one broker-side queue/partition.
///
/// `read` blocks until one delivery is copied in or `cancel` fires.
/// `acknowledge` confirms deliveries with the broker; success means the
/// deliveries "may be forgotten" — the exact semantics (ack vs. commit
/// offset) are broker-defined.
#[async_trait]
pub trait Stream: Send + Sync {
    async fn read(&self, cancel: CancellationToken) -> TransportResult<Delivery>;
    async fn acknowledge(
        &self,
        cancel: CancellationToken,
        deliveries: &[Delivery],
    ) -> TransportResult<()>;
    async fn close(&self) -> TransportResult<()>;
}

/// Publishes [`Dispatch`]es. An empty `write` is a no-op returning `Ok(0)`; a
/// write against an already-cancelled token returns immediately with a
/// cancellation error and publishes nothing.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(
        &mut self,
        cancel: CancellationToken,
        dispatches: &[Dispatch],
    ) -> TransportResult<usize>;
    async fn close(&mut self) -> TransportResult<()>;
}

/// A [`Writer`] with transactional commit/rollback semantics: `write`
/// buffers, `commit` publishes durably, `rollback` discards.
#[async_trait]
pub trait CommitWriter: Writer {
    async fn commit(&mut self) -> TransportResult<()>;
    async fn rollback(&mut self) -> TransportResult<()>;

    /// An opaque handle to a resource this writer holds that an inner
    /// handler may need to share — e.g. the outbox's own DB transaction, so
    /// application code can insert its own rows in the same transaction the
    /// outbox's row insert and final commit run inside (spec.md §4.5 step 4:
    /// "the inner handler may populate state.Tx via the derived context").
    /// `None` for writers with nothing to share.
    fn extension(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

/// Processes a batch of [`Delivery`] records.
///
/// Grounded on the upstream `Handler.Handle(ctx, messages ...interface{})`,
/// which signals failure by panicking; spec.md §9's REDESIGN FLAGS call for
/// an explicit `Result` instead, so `handle` returns one. A cancelled
/// `cancel` token is the caller's signal to stop offering new batches, not
/// itself a failure the handler needs to report.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, cancel: CancellationToken, deliveries: &[Delivery]) -> anyhow::Result<()>;
}

/// Something with a long-running `listen` loop that can be started and, via
/// [`ListenCloser`], stopped from outside. Grounded on the upstream
/// `Listener`/`ListenCloser` interfaces.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn listen(&self);
}

#[async_trait]
pub trait ListenCloser: Listener {
    async fn close(&self) -> TransportResult<()>;
}
