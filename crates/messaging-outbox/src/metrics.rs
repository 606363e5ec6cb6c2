//! Prometheus counters for the outbox pipeline, grounded on
//! `transactional-outbox::metrics::OutboxMetrics`.

use crate::monitor::OutboxMonitor;
use prometheus::{IntCounter, Opts, Registry};

pub struct OutboxMetrics {
    received_total: IntCounter,
    stored_total: IntCounter,
    published_total: IntCounter,
    confirmed_total: IntCounter,
}

impl OutboxMetrics {
    pub fn new(service: &str) -> Self {
        Self::register(service, prometheus::default_registry())
    }

    pub fn register(service: &str, registry: &Registry) -> Self {
        let metrics = Self {
            received_total: IntCounter::with_opts(
                Opts::new("outbox_messages_received_total", "messages buffered by a receiver")
                    .const_label("service", service),
            )
            .expect("valid metric options"),
            stored_total: IntCounter::with_opts(
                Opts::new("outbox_messages_stored_total", "messages persisted to the outbox table")
                    .const_label("service", service),
            )
            .expect("valid metric options"),
            published_total: IntCounter::with_opts(
                Opts::new("outbox_messages_published_total", "messages written to the transport")
                    .const_label("service", service),
            )
            .expect("valid metric options"),
            confirmed_total: IntCounter::with_opts(
                Opts::new("outbox_messages_confirmed_total", "messages marked dispatched")
                    .const_label("service", service),
            )
            .expect("valid metric options"),
        };

        for metric in [
            &metrics.received_total,
            &metrics.stored_total,
            &metrics.published_total,
            &metrics.confirmed_total,
        ] {
            if let Err(error) = registry.register(Box::new(metric.clone())) {
                tracing::warn!(%error, "outbox metrics: failed to register");
            }
        }

        metrics
    }
}

impl OutboxMonitor for OutboxMetrics {
    fn message_received(&self, count: usize) {
        self.received_total.inc_by(count as u64);
    }

    fn message_stored(&self, count: usize) {
        self.stored_total.inc_by(count as u64);
    }

    fn message_published(&self, count: usize) {
        self.published_total.inc_by(count as u64);
    }

    fn message_confirmed(&self, count: usize) {
        self.confirmed_total.inc_by(count as u64);
    }
}
