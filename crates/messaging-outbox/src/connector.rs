//! The outbox transport itself: a [`Connector`]/[`Connection`] pair backed by
//! a `sqlx::PgPool`, so the outbox can be handed to a [`messaging_transactional::TransactionalHandler`]
//! or a [`messaging_batch::BatchWriter`] like any other transport.
//!
//! Unlike a broker connector, every [`OutboxConnection`] shares the same
//! pool; `Connector::close` closes the pool itself (which already tracks its
//! own live connections), so there is no separate issued-connections ledger
//! to maintain here (contrast spec.md §9 "Connector.Close tracking", which
//! applies to connectors that open a distinct physical socket per
//! `Connection`).

use crate::config::IsolationLevel;
use crate::monitor::OutboxMonitor;
use crate::receiver::OutboxReceiver;
use crate::store::OutboxStore;
use async_trait::async_trait;
use messaging_contracts::{
    CancellationToken, CommitWriter, Connection, Connector, Reader, TransportError,
    TransportResult, Writer,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct OutboxConnection {
    pool: PgPool,
    store: Arc<OutboxStore>,
    channel: mpsc::Sender<messaging_contracts::Dispatch>,
    monitor: Arc<dyn OutboxMonitor>,
    isolation: IsolationLevel,
}

#[async_trait]
impl Connection for OutboxConnection {
    async fn reader(&self, _cancel: CancellationToken) -> TransportResult<Box<dyn Reader>> {
        Err(TransportError::Other(anyhow::anyhow!(
            "the outbox transport is write-only; it exposes no Reader"
        )))
    }

    async fn writer(&self, _cancel: CancellationToken) -> TransportResult<Box<dyn Writer>> {
        Err(TransportError::Other(anyhow::anyhow!(
            "the outbox transport requires a CommitWriter; a bare Writer has no transaction to store inside"
        )))
    }

    async fn commit_writer(
        &self,
        cancel: CancellationToken,
    ) -> TransportResult<Box<dyn CommitWriter>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| TransportError::ConnectFailed(error.to_string()))?;

        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation.as_sql()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|error| TransportError::ConnectFailed(error.to_string()))?;

        Ok(Box::new(OutboxReceiver::new(
            tx,
            self.channel.clone(),
            self.store.clone(),
            self.monitor.clone(),
            cancel,
        )))
    }

    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

/// Issues [`OutboxConnection`]s over a shared `PgPool`. `new` returns both the
/// connector and the receiving end of the channel the sender drains, mirroring
/// `sqlmq.New(transport) -> (Connector, ListenCloser)`.
pub struct OutboxConnector {
    pool: PgPool,
    store: Arc<OutboxStore>,
    channel: mpsc::Sender<messaging_contracts::Dispatch>,
    monitor: Arc<dyn OutboxMonitor>,
    isolation: IsolationLevel,
}

impl OutboxConnector {
    pub fn new(
        pool: PgPool,
        store: Arc<OutboxStore>,
        monitor: Arc<dyn OutboxMonitor>,
        channel_buffer: usize,
        isolation: IsolationLevel,
    ) -> (Self, mpsc::Sender<messaging_contracts::Dispatch>, mpsc::Receiver<messaging_contracts::Dispatch>)
    {
        let (tx, rx) = mpsc::channel(channel_buffer);
        let connector = Self {
            pool,
            store,
            channel: tx.clone(),
            monitor,
            isolation,
        };
        (connector, tx, rx)
    }
}

#[async_trait]
impl Connector for OutboxConnector {
    async fn connect(&self, _cancel: CancellationToken) -> TransportResult<Box<dyn Connection>> {
        Ok(Box::new(OutboxConnection {
            pool: self.pool.clone(),
            store: self.store.clone(),
            channel: self.channel.clone(),
            monitor: self.monitor.clone(),
            isolation: self.isolation,
        }))
    }

    async fn close(&self) -> TransportResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
