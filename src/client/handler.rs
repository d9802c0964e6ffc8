//! Event handler capability.
//!
//! The read pump hands every decoded [`Event`] to the configured handler on
//! tokio's blocking pool, so a slow handler never stalls further reads.
//!
//! # Example
//!
//! ```ignore
//! use relay_client::{Client, Event};
//!
//! let client = Client::builder("wss://relay.example.com/connect", "ws_123")
//!     .event_handler(|event: Event| println!("received {}", event.event_type))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::protocol::Event;

// ============================================================================
// EventHandler
// ============================================================================

/// Receives events pushed by the relay.
///
/// Invoked once per incoming frame that carries an event, concurrently with
/// the pumps. Implementations may block.
pub trait EventHandler: Send + Sync + 'static {
    /// Processes a single event.
    fn handle(&self, event: Event);
}

impl<F> EventHandler for F
where
    F: Fn(Event) + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, event: Event) {
        self(event)
    }
}

/// Shared handler reference stored in the client configuration.
pub type SharedEventHandler = Arc<dyn EventHandler>;

/// Returns the handler used when none is configured.
#[must_use]
pub(crate) fn noop_handler() -> SharedEventHandler {
    Arc::new(|_event: Event| {})
}

// ============================================================================
// Tests
// ============================================================================
