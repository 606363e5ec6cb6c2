//! The transactional outbox: a SQL-backed [`messaging_contracts::Connector`]
//! whose [`messaging_contracts::CommitWriter`] persists outbound messages
//! inside the caller's own database transaction, plus a background
//! [`OutboxSender`] that relays confirmed rows to the real transport.
//!
//! Grounded on the upstream `sqlmq` package (`dispatch_store.go`,
//! `dispatch_receiver.go`, `config.go`) and on the production
//! `transactional-outbox` crate's repository/processor split.

mod config;
mod connector;
mod error;
mod metrics;
mod monitor;
mod receiver;
mod sender;
mod store;

pub use config::{IsolationLevel, OutboxConfig};
pub use connector::{OutboxConnection, OutboxConnector};
pub use error::{OutboxError, OutboxResult};
pub use metrics::OutboxMetrics;
pub use monitor::{NopOutboxMonitor, OutboxMonitor, TracingOutboxMonitor};
pub use receiver::{OutboxReceiver, OutboxTransaction};
pub use sender::OutboxSender;
pub use store::OutboxStore;

/// Applies the `messages` table migration, mirroring `db-pool::migrate`'s
/// use of `sqlx::migrate!`.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Wires the outbox transport and its sender together over one `PgPool`,
/// mirroring `sqlmq.New(transport) -> (Connector, ListenCloser)`: the
/// returned pair share the store, the monitor, and the in-process channel.
pub fn new(
    pool: sqlx::PgPool,
    config: OutboxConfig,
    monitor: std::sync::Arc<dyn OutboxMonitor>,
    transport: std::sync::Arc<dyn messaging_contracts::Connector>,
) -> (OutboxConnector, OutboxSender) {
    let store = std::sync::Arc::new(OutboxStore::new(config.stride));
    let (connector, channel_tx, channel_rx) = OutboxConnector::new(
        pool.clone(),
        store.clone(),
        monitor.clone(),
        config.channel_buffer,
        config.isolation,
    );
    let sender = OutboxSender::new(pool, store, monitor, config, transport, channel_tx, channel_rx);
    (connector, sender)
}
