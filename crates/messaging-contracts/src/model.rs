//! Data model shared by every transport: [`Delivery`], [`Dispatch`], and
//! [`StreamConfig`]. Field names follow the upstream Go module's
//! `contracts.go` one-to-one; the two opaque payload slots (`decoded_message`
//! on `Delivery`, `message` on `Dispatch`) are modeled as `Box<dyn Any + Send
//! + Sync>` since Rust has no `interface{}`.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

/// Headers are broker-agnostic and may carry arbitrary JSON-representable
/// values, matching the Go `map[string]interface{}`.
pub type Headers = HashMap<String, serde_json::Value>;

/// An opaque application value carried alongside a [`Dispatch`] or
/// [`Delivery`] prior to / after (de)serialization. Serialization itself is
/// out of scope for this crate; see spec.md §1 Non-goals.
pub type OpaqueMessage = Box<dyn Any + Send + Sync>;

/// An inbound message record plus enough identity to acknowledge it later.
///
/// `upstream` is the raw, broker-specific object a concrete `Stream`
/// implementation needs in order to later acknowledge this exact delivery;
/// the core never inspects it.
pub struct Delivery {
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
    pub payload: Vec<u8>,
    pub headers: Headers,
    pub decoded_message: Option<OpaqueMessage>,
    pub upstream: Option<Box<dyn Any + Send + Sync>>,
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            delivery_id: 0,
            source_id: 0,
            message_id: 0,
            correlation_id: 0,
            timestamp: Utc::now(),
            durable: false,
            topic: String::new(),
            partition: 0,
            message_type: String::new(),
            content_type: String::new(),
            content_encoding: String::new(),
            payload: Vec::new(),
            headers: Headers::new(),
            decoded_message: None,
            upstream: None,
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_id", &self.delivery_id)
            .field("source_id", &self.source_id)
            .field("message_id", &self.message_id)
            .field("topic", &self.topic)
            .field("partition", &self.partition)
            .field("message_type", &self.message_type)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// An outbound message record.
///
/// Invariant (spec.md §3): a `Dispatch` with non-empty `payload` is
/// considered already serialized and must not be re-encoded; a `Dispatch`
/// with an empty `payload` and a present `message` is encoded exactly once
/// before transmission. See [`ensure_encoded`](crate::encode::ensure_encoded).
pub struct Dispatch {
    pub source_id: u64,
    pub message_id: u64,
    pub correlation_id: u64,
    pub timestamp: DateTime<Utc>,
    pub expiration: Duration,
    pub durable: bool,
    pub topic: String,
    pub partition_key: String,
    pub message_type: String,
    pub content_type: String,
    pub content_encoding: String,
    pub payload: Vec<u8>,
    pub headers: Headers,
    pub message: Option<OpaqueMessage>,
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            source_id: 0,
            message_id: 0,
            correlation_id: 0,
            timestamp: Utc::now(),
            expiration: Duration::ZERO,
            durable: false,
            topic: String::new(),
            partition_key: String::new(),
            message_type: String::new(),
            content_type: String::new(),
            content_encoding: String::new(),
            payload: Vec::new(),
            headers: Headers::new(),
            message: None,
        }
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("message_id", &self.message_id)
            .field("topic", &self.topic)
            .field("message_type", &self.message_type)
            .field("payload_len", &self.payload.len())
            .field("already_serialized", &self.is_serialized())
            .finish_non_exhaustive()
    }
}

impl Dispatch {
    /// A dispatch is considered serialized once it carries a payload.
    pub fn is_serialized(&self) -> bool {
        !self.payload.is_empty()
    }
}

/// Configuration for opening a single [`crate::Stream`] (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Re-establish broker topology (queues/exchanges/bindings) on open.
    pub establish_topology: bool,
    /// True if this is the only stream that will be opened against the broker.
    pub exclusive_stream: bool,
    pub buffer_capacity: u16,
    pub max_message_bytes: u32,
    pub stream_name: String,
    pub stream_replication: u16,
    pub group_name: String,
    /// Topics this stream subscribes to.
    pub topics: Vec<String>,
    /// Topics declared (for topology purposes) but not subscribed to.
    pub available_topics: Vec<String>,
    pub partition: u64,
    pub sequence: u64,
}

impl StreamConfig {
    pub fn new() -> Self {
        Self {
            max_message_bytes: 1024 * 1024,
            establish_topology: true,
            buffer_capacity: 1,
            ..Default::default()
        }
    }
}
