/// Callbacks fired at each stage of the outbox pipeline (spec.md §6
/// "Observability interfaces": `MessageReceived/Stored/Published/Confirmed`).
pub trait OutboxMonitor: Send + Sync {
    fn message_received(&self, _count: usize) {}
    fn message_stored(&self, _count: usize) {}
    fn message_published(&self, _count: usize) {}
    fn message_confirmed(&self, _count: usize) {}
}

pub struct NopOutboxMonitor;

impl OutboxMonitor for NopOutboxMonitor {}

pub struct TracingOutboxMonitor;

impl OutboxMonitor for TracingOutboxMonitor {
    fn message_received(&self, count: usize) {
        tracing::debug!(count, "outbox: messages received");
    }

    fn message_stored(&self, count: usize) {
        tracing::debug!(count, "outbox: messages stored");
    }

    fn message_published(&self, count: usize) {
        tracing::info!(count, "outbox: messages published");
    }

    fn message_confirmed(&self, count: usize) {
        tracing::info!(count, "outbox: messages confirmed");
    }
}
