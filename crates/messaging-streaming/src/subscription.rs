//! Immutable subscription configuration (spec.md §3/§4.9), grounded on the
//! upstream `streaming/subscription.go` and `streaming/subscription_config.go`.

use crate::error::StreamingError;
use messaging_contracts::{Handler, StreamConfig};
use std::sync::Arc;
use std::time::Duration;

/// How a subscriber winds down once its soft context is cancelled (spec.md
/// §4.9/§4.10). Grounded on the upstream `ShutdownStrategy` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownStrategy {
    /// Finish the batch currently being handled, then stop.
    CurrentBatch,
    /// Stop as soon as the soft cancel is observed, mid-batch.
    Immediate,
    /// Keep batching until the channel drains or the shutdown timeout
    /// elapses, whichever comes first.
    #[default]
    Drain,
}

/// Describes the streams a [`crate::Subscriber`] opens, the handlers its
/// workers run, and the batching/shutdown policy those workers follow.
/// Immutable once built; construct via [`Subscription::builder`].
#[derive(Clone)]
pub struct Subscription {
    pub(crate) stream_configs: Vec<StreamConfig>,
    pub(crate) handlers: Vec<Arc<dyn Handler>>,
    pub(crate) buffer_capacity: u16,
    pub(crate) batch_capacity: u16,
    pub(crate) handle_delivery: bool,
    pub(crate) delivery_to_context: bool,
    pub(crate) buffer_timeout: Duration,
    pub(crate) reconnect_delay: Duration,
    pub(crate) shutdown_strategy: ShutdownStrategy,
    pub(crate) shutdown_timeout: Duration,
}

impl Subscription {
    pub fn builder() -> SubscriptionBuilder {
        SubscriptionBuilder::default()
    }
}

/// Builder for [`Subscription`], grounded on the upstream
/// `SubscriptionOptions` option singleton (`AddStream`, `AddWorkers`,
/// `FullThrottle`, `BufferCapacity`, `BatchCapacity`,
/// `BufferDelayBetweenBatches`, `ShutdownStrategy`, ...).
pub struct SubscriptionBuilder {
    stream_configs: Vec<StreamConfig>,
    handlers: Vec<Arc<dyn Handler>>,
    buffer_capacity: u16,
    batch_capacity: u16,
    handle_delivery: bool,
    delivery_to_context: bool,
    buffer_timeout: Duration,
    reconnect_delay: Duration,
    shutdown_strategy: ShutdownStrategy,
    shutdown_timeout: Duration,
}

impl Default for SubscriptionBuilder {
    fn default() -> Self {
        Self {
            stream_configs: Vec::new(),
            handlers: Vec::new(),
            buffer_capacity: 1,
            batch_capacity: 1,
            handle_delivery: false,
            delivery_to_context: false,
            buffer_timeout: Duration::ZERO,
            reconnect_delay: Duration::from_secs(5),
            shutdown_strategy: ShutdownStrategy::Drain,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl SubscriptionBuilder {
    pub fn add_stream(mut self, config: StreamConfig) -> Self {
        self.stream_configs.push(config);
        self
    }

    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn add_handlers(mut self, handlers: impl IntoIterator<Item = Arc<dyn Handler>>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Raises both `buffer_capacity` and `batch_capacity` to `u16::MAX`,
    /// mirroring the upstream `FullThrottle` option.
    pub fn full_throttle(mut self) -> Self {
        self.buffer_capacity = u16::MAX;
        self.batch_capacity = u16::MAX;
        self
    }

    pub fn buffer_capacity(mut self, value: u16) -> Self {
        self.buffer_capacity = value;
        self
    }

    pub fn batch_capacity(mut self, value: u16) -> Self {
        self.batch_capacity = value;
        self
    }

    pub fn full_delivery_to_handler(mut self, value: bool) -> Self {
        self.handle_delivery = value;
        self
    }

    pub fn full_delivery_to_context(mut self, value: bool) -> Self {
        self.delivery_to_context = value;
        self
    }

    pub fn buffer_delay_between_batches(mut self, value: Duration) -> Self {
        self.buffer_timeout = value;
        self
    }

    pub fn reconnect_delay(mut self, value: Duration) -> Self {
        self.reconnect_delay = value;
        self
    }

    /// Sets the shutdown strategy and its timeout. `Immediate` always forces
    /// the timeout to zero, matching the upstream option's auto-correction.
    pub fn shutdown_strategy(mut self, strategy: ShutdownStrategy, timeout: Duration) -> Self {
        self.shutdown_strategy = strategy;
        self.shutdown_timeout = if strategy == ShutdownStrategy::Immediate {
            Duration::ZERO
        } else {
            timeout
        };
        self
    }

    /// Validates and raises `buffer_capacity` to at least the handler count
    /// (spec.md §3 invariant), mirroring the upstream `apply()`.
    pub fn build(self) -> Result<Subscription, StreamingError> {
        if self.handlers.is_empty() {
            return Err(StreamingError::NoHandlers);
        }

        let handler_count = self.handlers.len() as u16;
        let buffer_capacity = self.buffer_capacity.max(handler_count);

        Ok(Subscription {
            stream_configs: self.stream_configs,
            handlers: self.handlers,
            buffer_capacity,
            batch_capacity: self.batch_capacity,
            handle_delivery: self.handle_delivery,
            delivery_to_context: self.delivery_to_context,
            buffer_timeout: self.buffer_timeout,
            reconnect_delay: self.reconnect_delay,
            shutdown_strategy: self.shutdown_strategy,
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging_contracts::{CancellationToken, Delivery};
    use async_trait::async_trait;

    struct NoopHandler;

    #[async_trait]
    impl Handler for NoopHandler {
        async fn handle(&self, _cancel: CancellationToken, _deliveries: &[Delivery]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn build_rejects_a_subscription_with_no_handlers() {
        let result = Subscription::builder().build();
        assert!(matches!(result, Err(StreamingError::NoHandlers)));
    }

    #[test]
    fn build_raises_buffer_capacity_to_the_handler_count() {
        let subscription = Subscription::builder()
            .add_handler(Arc::new(NoopHandler))
            .add_handler(Arc::new(NoopHandler))
            .add_handler(Arc::new(NoopHandler))
            .buffer_capacity(1)
            .build()
            .unwrap();

        assert_eq!(subscription.buffer_capacity, 3);
    }

    #[test]
    fn immediate_strategy_forces_a_zero_shutdown_timeout() {
        let subscription = Subscription::builder()
            .add_handler(Arc::new(NoopHandler))
            .shutdown_strategy(ShutdownStrategy::Immediate, Duration::from_secs(30))
            .build()
            .unwrap();

        assert_eq!(subscription.shutdown_timeout, Duration::ZERO);
    }
}
