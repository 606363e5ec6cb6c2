//! Well-known context slot for the unacknowledged batch (spec.md §4.10:
//! "ctxForHandler is hardCtx optionally enriched with the unack list under a
//! well-known key"). Grounded on the upstream `worker.go`'s use of
//! `context.WithValue` to attach the delivery batch when
//! `FullDeliveryToContext` is set; Rust has no `context.Context` value bag,
//! so a `tokio::task_local!` scoped around the handler call stands in for it.

use chrono::{DateTime, Utc};
use messaging_contracts::{Delivery, Headers};
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static DELIVERY_CONTEXT: Arc<Vec<DeliverySummary>>;
}

/// The plain-data fields of a [`Delivery`], cloned out for context
/// enrichment. Drops `decoded_message`/`upstream` (neither is `Clone` — both
/// are opaque `Box<dyn Any>` slots the handler already has direct access to
/// when it receives the `Delivery` batch itself).
#[derive(Debug, Clone)]
pub struct DeliverySummary {
    pub delivery_id: u64,
    pub source_id: u64,
    pub message_id: u64,
    pub correlation_id: u64,
    pub timestamp: DateTime<Utc>,
    pub durable: bool,
    pub topic: String,
    pub partition: u64,
    pub message_type: String,
    pub content_type: String,
    pub content_encoding: String,
    pub headers: Headers,
}

impl From<&Delivery> for DeliverySummary {
    fn from(delivery: &Delivery) -> Self {
        Self {
            delivery_id: delivery.delivery_id,
            source_id: delivery.source_id,
            message_id: delivery.message_id,
            correlation_id: delivery.correlation_id,
            timestamp: delivery.timestamp,
            durable: delivery.durable,
            topic: delivery.topic.clone(),
            partition: delivery.partition,
            message_type: delivery.message_type.clone(),
            content_type: delivery.content_type.clone(),
            content_encoding: delivery.content_encoding.clone(),
            headers: delivery.headers.clone(),
        }
    }
}

/// Reads the unacknowledged batch stashed under the well-known context key,
/// if the current task is running inside a handler invocation made with
/// `full_delivery_to_context(true)`. `None` otherwise.
pub fn current_deliveries() -> Option<Arc<Vec<DeliverySummary>>> {
    DELIVERY_CONTEXT.try_with(|value| value.clone()).ok()
}

/// Runs `fut` with `deliveries` stashed under the well-known key, readable
/// via [`current_deliveries`] for the duration of the future.
pub(crate) async fn scope<F: Future>(deliveries: Arc<Vec<DeliverySummary>>, fut: F) -> F::Output {
    DELIVERY_CONTEXT.scope(deliveries, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_deliveries_is_none_outside_a_scope() {
        assert!(current_deliveries().is_none());
    }

    #[tokio::test]
    async fn current_deliveries_reads_back_what_scope_stashed() {
        let summary = DeliverySummary::from(&Delivery {
            delivery_id: 7,
            ..Default::default()
        });
        let stashed = Arc::new(vec![summary]);

        scope(stashed.clone(), async {
            let read_back = current_deliveries().expect("inside scope");
            assert_eq!(read_back[0].delivery_id, 7);
        })
        .await;

        assert!(current_deliveries().is_none());
    }
}
