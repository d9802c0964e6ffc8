//! Relay protocol message types.
//!
//! This module defines the JSON envelopes exchanged with the relay over
//! WebSocket text frames.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `IncomingMessage` | Relay → Client | Pushed frame, may embed an `Event` |
//! | `Event` | Relay → Client | Application event for the handler |
//! | `OutgoingMessage` | Client → Relay | Response payload queued by the caller |
//!
//! Heartbeats are WebSocket control frames (Ping/Pong) and never reach
//! this layer.

// ============================================================================
// Submodules
// ============================================================================

/// Event payload type.
pub mod event;

/// Incoming and outgoing envelopes.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Event;
pub use message::{IncomingMessage, OutgoingMessage};
