//! Broker-agnostic messaging client library.
//!
//! This crate re-exports the building blocks implemented across the
//! workspace's member crates so callers can depend on a single `messaging`
//! crate the way they would depend on `github.com/smarty/messaging`:
//!
//! - [`messaging_contracts`] — `Connector`/`Connection`/`Reader`/`Writer`/
//!   `CommitWriter`/`Stream`, `Delivery`, `Dispatch`, `StreamConfig`, and the
//!   connection pool.
//! - [`messaging_batch`] — the open-write-commit-close batch writer.
//! - [`messaging_retry`] — the bounded-backoff retry decorator.
//! - [`messaging_transactional`] — the transactional handler.
//! - [`messaging_outbox`] — the SQL-backed transactional outbox.
//! - [`messaging_streaming`] — subscriptions, subscribers, workers, and the
//!   manager that runs them.

pub use messaging_batch as batch;
pub use messaging_contracts as contracts;
pub use messaging_outbox as outbox;
pub use messaging_retry as retry;
pub use messaging_streaming as streaming;
pub use messaging_transactional as transactional;

pub use messaging_contracts::{
    CancellationToken, CommitWriter, Connection, Connector, Delivery, Dispatch, Handler,
    ListenCloser, Listener, Reader, ShutdownToken, Stream, StreamConfig, Writer,
};
