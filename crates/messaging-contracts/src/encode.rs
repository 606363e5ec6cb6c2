//! The single encode-once hook a caller plugs a real serializer into.
//!
//! The actual JSON (or other) codec is out of scope for this crate (spec.md
//! §1 Non-goals); what's in scope is the invariant from spec.md §3: a
//! [`Dispatch`] with a non-empty payload is already serialized and must not
//! be re-encoded, while one with an empty payload and a present `message` is
//! encoded exactly once. Grounded on the upstream
//! `serialization.DispatchEncoder.Encode` early-return check.

use crate::error::TransportError;
use crate::model::Dispatch;

/// Implemented by whatever serializer a caller wires in (JSON, protobuf,
/// ...). Left abstract here; concrete codecs live outside this crate.
pub trait Encoder: Send + Sync {
    fn content_type(&self) -> &str;
    fn encode(&self, message: &(dyn std::any::Any + Send + Sync)) -> Result<Vec<u8>, TransportError>;
}

/// Encode `dispatch.message` into `dispatch.payload` exactly once.
///
/// No-op if the dispatch is already serialized (non-empty payload) or has no
/// `message` to encode.
pub fn ensure_encoded(dispatch: &mut Dispatch, encoder: &dyn Encoder) -> Result<(), TransportError> {
    if dispatch.is_serialized() || dispatch.message.is_none() {
        return Ok(());
    }

    let message = dispatch
        .message
        .as_deref()
        .expect("checked is_some above");
    let payload = encoder.encode(message)?;
    dispatch.payload = payload;
    dispatch.content_type = encoder.content_type().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopEncoder;
    impl Encoder for NoopEncoder {
        fn content_type(&self) -> &str {
            "application/octet-stream"
        }
        fn encode(&self, _message: &(dyn std::any::Any + Send + Sync)) -> Result<Vec<u8>, TransportError> {
            Ok(vec![1, 2, 3])
        }
    }

    #[test]
    fn already_serialized_dispatch_is_left_untouched() {
        let mut dispatch = Dispatch {
            payload: vec![9, 9, 9],
            message: Some(Box::new(42u32)),
            ..Default::default()
        };
        ensure_encoded(&mut dispatch, &NoopEncoder).unwrap();
        assert_eq!(dispatch.payload, vec![9, 9, 9]);
    }

    #[test]
    fn unserialized_dispatch_with_message_is_encoded_once() {
        let mut dispatch = Dispatch {
            message: Some(Box::new(42u32)),
            ..Default::default()
        };
        ensure_encoded(&mut dispatch, &NoopEncoder).unwrap();
        assert_eq!(dispatch.payload, vec![1, 2, 3]);
        assert_eq!(dispatch.content_type, "application/octet-stream");
    }

    #[test]
    fn dispatch_with_no_message_and_no_payload_is_left_empty() {
        let mut dispatch = Dispatch::default();
        ensure_encoded(&mut dispatch, &NoopEncoder).unwrap();
        assert!(dispatch.payload.is_empty());
    }
}
