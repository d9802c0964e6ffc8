//! Incoming and outgoing message envelopes.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_slice, from_str, to_string};

use crate::error::Result;
use crate::identifiers::MessageId;

use super::Event;

// ============================================================================
// IncomingMessage
// ============================================================================

/// A decoded frame pushed by the relay.
///
/// # Format
///
/// ```json
/// {
///   "type": "event",
///   "event": { "id": "evt_1", "type": "invoice.paid", "payload": { ... } }
/// }
/// ```
///
/// Frames without an `event` field carry nothing for the handler and are
/// dropped after decoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingMessage {
    /// Frame type marker.
    #[serde(rename = "type", default)]
    pub message_type: String,

    /// Embedded application event, if any.
    #[serde(default)]
    pub event: Option<Event>,
}

impl IncomingMessage {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the frame is not a
    /// valid envelope.
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(from_str(text)?)
    }

    /// Decodes a binary frame holding UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the frame is not a
    /// valid envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(from_slice(bytes)?)
    }

    /// Consumes the message, returning the embedded event.
    #[inline]
    #[must_use]
    pub fn into_event(self) -> Option<Event> {
        self.event
    }
}

// ============================================================================
// OutgoingMessage
// ============================================================================

/// A message queued by the caller for delivery to the relay.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "type": "event_ack",
///   "payload": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    /// Unique identifier, preserved across a requeue.
    pub id: MessageId,

    /// Message type name.
    #[serde(rename = "type")]
    pub message_type: String,

    /// Opaque payload.
    pub payload: Value,
}

impl OutgoingMessage {
    /// Creates a new message with an auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: MessageId::generate(),
            message_type: message_type.into(),
            payload,
        }
    }

    /// Serializes the message into the text sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload cannot be
    /// serialized.
    pub fn to_text(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_incoming_with_event() {
        let text = r#"{"type":"event","event":{"id":"evt_1","type":"charge.succeeded","payload":{}}}"#;
        let msg = IncomingMessage::from_text(text).expect("parse");

        assert_eq!(msg.message_type, "event");
        let event = msg.into_event().expect("event present");
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "charge.succeeded");
    }

    #[test]
    fn test_incoming_without_event() {
        let msg = IncomingMessage::from_text(r#"{"type":"status"}"#).expect("parse");
        assert!(msg.event.is_none());
    }

    #[test]
    fn test_incoming_ignores_unknown_fields() {
        let msg = IncomingMessage::from_text(r#"{"type":"status","extra":true}"#).expect("parse");
        assert_eq!(msg.message_type, "status");
    }

    #[test]
    fn test_incoming_malformed() {
        assert!(IncomingMessage::from_text("not json").is_err());
        assert!(IncomingMessage::from_text(r#"{"event":"wrong shape"}"#).is_err());
    }

    #[test]
    fn test_incoming_from_bytes() {
        let msg = IncomingMessage::from_bytes(br#"{"type":"status"}"#).expect("parse");
        assert_eq!(msg.message_type, "status");
    }

    #[test]
    fn test_outgoing_format() {
        let msg = OutgoingMessage::new("event_ack", json!({ "event_id": "evt_1" }));
        let value: Value = serde_json::from_str(&msg.to_text().expect("serialize")).expect("json");

        assert_eq!(value["id"], msg.id.to_string());
        assert_eq!(value["type"], "event_ack");
        assert_eq!(value["payload"]["event_id"], "evt_1");
    }

    #[test]
    fn test_outgoing_ids_unique() {
        let a = OutgoingMessage::new("a", Value::Null);
        let b = OutgoingMessage::new("a", Value::Null);
        assert_ne!(a.id, b.id);
    }
}
