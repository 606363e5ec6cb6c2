//! The outbox sender / dispatch processor (spec.md §4.8), grounded on
//! `sqlmq/config.go`'s wiring (`Sender = batch.NewWriter(Target,
//! CloseConnector(false))`) and reimplemented as a channel-draining
//! `ListenCloser` rather than `transactional-outbox::OutboxProcessor`'s
//! poll-interval loop — see DESIGN.md for why.

use crate::config::OutboxConfig;
use crate::monitor::OutboxMonitor;
use crate::store::OutboxStore;
use async_trait::async_trait;
use messaging_batch::BatchWriter;
use messaging_contracts::{CancellationToken, Connector, Dispatch, Listener, ListenCloser, TransportResult, Writer};
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub struct OutboxSender {
    pool: PgPool,
    store: Arc<OutboxStore>,
    monitor: Arc<dyn OutboxMonitor>,
    config: OutboxConfig,
    channel_tx: mpsc::Sender<Dispatch>,
    channel_rx: Mutex<mpsc::Receiver<Dispatch>>,
    writer: Mutex<BatchWriter>,
    last_confirmed_id: AtomicU64,
    cancel: CancellationToken,
}

impl OutboxSender {
    /// `transport` is the real underlying broker connector the sender
    /// publishes to, wrapped in a batch writer with `reuse_writer=true`,
    /// `close_connector=false` — the same configuration
    /// `sqlmq/config.go`'s default `Sender` uses.
    pub fn new(
        pool: PgPool,
        store: Arc<OutboxStore>,
        monitor: Arc<dyn OutboxMonitor>,
        config: OutboxConfig,
        transport: Arc<dyn Connector>,
        channel_tx: mpsc::Sender<Dispatch>,
        channel_rx: mpsc::Receiver<Dispatch>,
    ) -> Self {
        let writer_config = messaging_batch::BatchWriterConfig::default()
            .with_reuse_writer(true)
            .with_close_connector(false);

        Self {
            pool,
            store,
            monitor,
            config,
            channel_tx,
            channel_rx: Mutex::new(channel_rx),
            writer: Mutex::new(BatchWriter::with_config(transport, writer_config)),
            last_confirmed_id: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    async fn replay(&self) {
        let last = self.last_confirmed_id.load(Ordering::SeqCst);
        match self.store.load(&self.pool, last).await {
            Ok(rows) if rows.is_empty() => {}
            Ok(rows) => {
                tracing::info!(count = rows.len(), "outbox sender: replaying unsent rows");
                for dispatch in rows {
                    if self.channel_tx.send(dispatch).await.is_err() {
                        return;
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%error, "outbox sender: replay load failed");
            }
        }
    }

    async fn drain_batch(&self) -> Option<Vec<Dispatch>> {
        let mut rx = self.channel_rx.lock().await;

        let first = tokio::select! {
            item = rx.recv() => item,
            _ = self.cancel.cancelled() => return None,
        };
        let first = first?;

        let mut batch = vec![first];
        while batch.len() < self.config.sender_batch_size {
            match rx.try_recv() {
                Ok(dispatch) => batch.push(dispatch),
                Err(_) => break,
            }
        }
        Some(batch)
    }

    async fn publish_and_confirm(&self, batch: &[Dispatch]) {
        let result = {
            let mut writer = self.writer.lock().await;
            writer.write(self.cancel.clone(), batch).await
        };

        match result {
            Ok(_) => {
                self.monitor.message_published(batch.len());
                if let Err(error) = self.store.confirm(&self.pool, batch).await {
                    tracing::warn!(%error, "outbox sender: confirm failed");
                    return;
                }
                self.monitor.message_confirmed(batch.len());
                if let Some(max_id) = batch.iter().map(|d| d.message_id).max() {
                    self.last_confirmed_id.fetch_max(max_id, Ordering::SeqCst);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "outbox sender: transport write failed, will replay");
                let _ = self.writer.lock().await.close().await;
                tokio::select! {
                    _ = tokio::time::sleep(self.config.retry_timeout) => {}
                    _ = self.cancel.cancelled() => {}
                }
                self.replay().await;
            }
        }
    }

    async fn run(&self) {
        self.replay().await;

        while let Some(batch) = self.drain_batch().await {
            self.publish_and_confirm(&batch).await;
        }
    }
}

#[async_trait]
impl Listener for OutboxSender {
    async fn listen(&self) {
        self.run().await;
    }
}

#[async_trait]
impl ListenCloser for OutboxSender {
    async fn close(&self) -> TransportResult<()> {
        self.cancel.cancel();
        Ok(())
    }
}
