//! A [`messaging_contracts::Handler`] decorator that opens a transaction
//! (via a [`messaging_contracts::CommitWriter`]) before running an inner
//! handler built from the resulting [`State`], committing on success and
//! rolling back on failure.
//!
//! Grounded on the upstream Go `handlers/transactional` package.

mod error;
mod handler;
mod monitor;
mod state;

pub use error::TransactionalError;
pub use handler::{HandlerFactory, TransactionalHandler};
pub use monitor::{NopTransactionMonitor, TracingTransactionMonitor, TransactionMonitor};
pub use state::State;
