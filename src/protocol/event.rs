//! Event payload type.
//!
//! Events are pushed by the relay and handed to the configured
//! [`EventHandler`](crate::EventHandler).

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Event
// ============================================================================

/// An application event embedded in an incoming frame.
///
/// # Format
///
/// ```json
/// {
///   "id": "evt_123",
///   "type": "invoice.paid",
///   "payload": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Relay-assigned event identifier.
    pub id: String,

    /// Event type name.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event-specific data, opaque to the client.
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            payload,
        }
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
    fn test_event_deserialize() {
        let event: Event = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "invoice.paid",
            "payload": { "amount": 42 }
        }))
        .expect("parse");

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "invoice.paid");
        assert_eq!(event.payload["amount"], 42);
    }

    #[test]
    fn test_event_payload_defaults_to_null() {
        let event: Event =
            serde_json::from_value(json!({ "id": "evt_2", "type": "ping" })).expect("parse");
        assert!(event.payload.is_null());
    }
}
