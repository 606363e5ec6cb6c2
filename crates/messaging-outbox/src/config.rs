use std::time::Duration;

/// Isolation level the outbox's `Store` runs under, set on the caller's
/// transaction. Grounded on `sqlmq/config.go`'s `SQLTxOptions.Isolation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// The `SET TRANSACTION ISOLATION LEVEL ...` clause for this level.
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Configuration for the outbox transport (spec.md §6 "Outbox").
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Capacity of the in-process channel between receivers and the sender.
    pub channel_buffer: usize,
    pub isolation: IsolationLevel,
    /// How long the sender sleeps after a transport failure before replaying.
    pub retry_timeout: Duration,
    /// Auto-increment step; only 1 unless the backing database is configured
    /// for multi-master increments that skip values (spec.md §9 "Outbox
    /// stride").
    pub stride: u64,
    /// Upper bound on how many dispatches the sender drains from the channel
    /// before publishing a batch (spec.md §4.8 step 1).
    pub sender_batch_size: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            isolation: IsolationLevel::ReadCommitted,
            retry_timeout: Duration::from_secs(5),
            stride: 1,
            sender_batch_size: 100,
        }
    }
}

impl OutboxConfig {
    pub fn with_channel_buffer(mut self, value: usize) -> Self {
        self.channel_buffer = value;
        self
    }

    pub fn with_isolation(mut self, value: IsolationLevel) -> Self {
        self.isolation = value;
        self
    }

    pub fn with_retry_timeout(mut self, value: Duration) -> Self {
        self.retry_timeout = value;
        self
    }

    pub fn with_stride(mut self, value: u64) -> Self {
        self.stride = value;
        self
    }

    pub fn with_sender_batch_size(mut self, value: usize) -> Self {
        self.sender_batch_size = value;
        self
    }
}
