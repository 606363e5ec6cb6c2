//! The connection pool (spec.md §4.2).
//!
//! Lazily opens a [`Connection`] the first time [`ConnectionPool::active`] is
//! called and returns the same instance until [`ConnectionPool::dispose`] is
//! invoked, at which point the connection is closed and the next `active`
//! call reconnects. Reconnect backoff on repeated failure is the caller's
//! responsibility (the [`crate`] subscriber applies `reconnect_delay`), not
//! the pool's.
//!
//! The pool type itself was not present in the retrieved upstream Go source
//! (only its call sites in `streaming/subscriber.go` were available); its
//! internals below are authored fresh in the idiom the rest of this
//! workspace uses for shared mutable state guarded by a lock
//! (`parking_lot::Mutex`, as `resilience::circuit_breaker` guards its state
//! with `parking_lot::RwLock`).

use crate::error::TransportError;
use crate::traits::{Connection, Connector};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lends at most one active [`Connection`] to a single caller (a subscriber
/// owns its pool exclusively; the pool is not meant to be shared across
/// concurrent subscribers).
pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    slot: Mutex<Option<Arc<dyn Connection>>>,
}

impl ConnectionPool {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
        }
    }

    /// Returns the currently active connection, opening one if none exists.
    pub async fn active(
        &self,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        if let Some(existing) = self.slot.lock().clone() {
            return Ok(existing);
        }

        let connection: Arc<dyn Connection> = Arc::from(self.connector.connect(cancel).await?);
        *self.slot.lock() = Some(connection.clone());
        debug!("connection pool: opened a new connection");
        Ok(connection)
    }

    /// Closes the connection and clears the slot so the next `active` call
    /// reconnects.
    pub async fn dispose(&self, connection: Arc<dyn Connection>) {
        *self.slot.lock() = None;
        if let Err(error) = connection.close().await {
            debug!(%error, "connection pool: error closing disposed connection");
        }
    }
}
