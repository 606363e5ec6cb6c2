//! The outbox `CommitWriter` facade (spec.md §4.7), grounded on
//! `sqlmq/dispatch_receiver.go`. `write` only buffers; `commit` persists the
//! buffer inside the held transaction, commits it, and forwards the buffered
//! dispatches onto the sender's channel. Single-use: discard after `commit`
//! or `rollback`.

use crate::monitor::OutboxMonitor;
use crate::store::OutboxStore;
use async_trait::async_trait;
use messaging_contracts::{CancellationToken, CommitWriter, Dispatch, TransportError, TransportResult, Writer};
use sqlx::{Postgres, Transaction};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// The outbox's own DB transaction, shared with the application handler
/// through the transactional handler's `State::extension` (spec.md §4.5 step
/// 4: "the inner handler may populate state.Tx via the derived context").
/// `None` once `commit`/`rollback`/`close` has consumed it.
pub type OutboxTransaction = Mutex<Option<Transaction<'static, Postgres>>>;

/// Copies every field `store`/`load`/`confirm` and the sender care about,
/// dropping the opaque pre-serialization `message` slot: by the time a
/// dispatch reaches this receiver it has already passed through
/// `ensure_encoded`, so `payload` carries everything downstream needs.
fn snapshot(dispatch: &Dispatch) -> Dispatch {
    Dispatch {
        source_id: dispatch.source_id,
        message_id: dispatch.message_id,
        correlation_id: dispatch.correlation_id,
        timestamp: dispatch.timestamp,
        expiration: dispatch.expiration,
        durable: dispatch.durable,
        topic: dispatch.topic.clone(),
        partition_key: dispatch.partition_key.clone(),
        message_type: dispatch.message_type.clone(),
        content_type: dispatch.content_type.clone(),
        content_encoding: dispatch.content_encoding.clone(),
        payload: dispatch.payload.clone(),
        headers: dispatch.headers.clone(),
        message: None,
    }
}

pub struct OutboxReceiver {
    tx: Arc<OutboxTransaction>,
    channel: mpsc::Sender<Dispatch>,
    store: Arc<OutboxStore>,
    monitor: Arc<dyn OutboxMonitor>,
    cancel: CancellationToken,
    buffer: Vec<Dispatch>,
}

impl OutboxReceiver {
    pub fn new(
        tx: Transaction<'static, Postgres>,
        channel: mpsc::Sender<Dispatch>,
        store: Arc<OutboxStore>,
        monitor: Arc<dyn OutboxMonitor>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            channel,
            store,
            monitor,
            cancel,
            buffer: Vec::new(),
        }
    }
}

#[async_trait]
impl Writer for OutboxReceiver {
    async fn write(
        &mut self,
        cancel: CancellationToken,
        dispatches: &[Dispatch],
    ) -> TransportResult<usize> {
        if dispatches.is_empty() {
            return Ok(0);
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        self.buffer.extend(dispatches.iter().map(snapshot));
        self.monitor.message_received(dispatches.len());
        Ok(dispatches.len())
    }

    async fn close(&mut self) -> TransportResult<()> {
        // Dropping an open sqlx::Transaction rolls it back; nothing further
        // to do if commit/rollback was never called.
        self.tx.lock().await.take();
        Ok(())
    }
}

#[async_trait]
impl CommitWriter for OutboxReceiver {
    async fn commit(&mut self) -> TransportResult<()> {
        let mut tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::CommitFailed("outbox receiver already used".into()))?;

        if let Err(error) = self.store.store(&mut tx, &mut self.buffer).await {
            tracing::warn!(%error, "outbox receiver: store failed");
            let _ = tx.rollback().await;
            return Err(TransportError::CommitFailed(error.to_string()));
        }

        if let Err(error) = tx.commit().await {
            if self.cancel.is_cancelled() {
                tracing::info!(%error, "outbox receiver: commit raced with cancellation");
            } else {
                tracing::warn!(%error, "outbox receiver: commit failed");
            }
            return Err(TransportError::CommitFailed(error.to_string()));
        }

        self.monitor.message_stored(self.buffer.len());

        for dispatch in self.buffer.drain(..) {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(TransportError::Cancelled),
                result = self.channel.send(dispatch) => {
                    if result.is_err() {
                        return Err(TransportError::CommitFailed(
                            "outbox sender channel closed".into(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    async fn rollback(&mut self) -> TransportResult<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::RollbackFailed("outbox receiver already used".into()))?;
        tx.rollback()
            .await
            .map_err(|error| TransportError::RollbackFailed(error.to_string()))
    }

    /// Shares the outbox's own transaction (as an [`OutboxTransaction`]) so
    /// the application handler running inside the transactional handler can
    /// run its own inserts against the same transaction this receiver will
    /// later store a row into and commit.
    fn extension(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        Some(self.tx.clone() as Arc<dyn Any + Send + Sync>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_pod_fields_and_drops_the_opaque_message() {
        let dispatch = Dispatch {
            message_type: "order.created".to_string(),
            topic: "orders".to_string(),
            payload: vec![1, 2, 3],
            message: Some(Box::new(42_u32)),
            ..Default::default()
        };

        let copy = snapshot(&dispatch);
        assert_eq!(copy.message_type, "order.created");
        assert_eq!(copy.topic, "orders");
        assert_eq!(copy.payload, vec![1, 2, 3]);
        assert!(copy.message.is_none());
    }
}
