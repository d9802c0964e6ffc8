//! WebSocket transport layer.
//!
//! This module owns everything that touches a physical connection: dialing,
//! the per-connection epoch, and the two pumps.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Client          │                              │  Relay          │
//! │                  │         WebSocket            │                 │
//! │  Dialer          │─────────────────────────────►│                 │
//! │  Epoch           │                              │                 │
//! │   ├ ReadPump  ◄──┼──────────── events, pongs ───│                 │
//! │   └ WritePump ───┼── messages, pings, close ───►│                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Dialer::dial` - One connection attempt, retried by the client
//! 2. `Epoch::start` - Split the stream, spawn both pumps
//! 3. `Epoch::connection_lost` - First failure reported by a pump
//! 4. `Epoch::join` / `Epoch::shutdown` - Stop both pumps and wait for them
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dialer` | `Dialer` trait, default `WsDialer`, handshake headers |
//! | `epoch` | Per-connection state and teardown |
//! | `queue` | Outbound queue shared across epochs |
//! | `read_pump` | Inbound pump |
//! | `write_pump` | Outbound pump |

// ============================================================================
// Submodules
// ============================================================================

/// Dialing and handshake request construction.
pub mod dialer;

/// Per-connection state.
pub(crate) mod epoch;

/// Outbound message queue.
pub(crate) mod queue;

/// Inbound pump.
pub(crate) mod read_pump;

/// Outbound pump.
pub(crate) mod write_pump;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// Re-exports
// ============================================================================

pub use dialer::{BoxedIo, Dialer, Io, WsDialer, handshake_request};
pub(crate) use epoch::Epoch;
pub(crate) use queue::OutboundQueue;

// ============================================================================
// Deadlines
// ============================================================================

/// Stand-in for deadlines too far out to represent (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `now + wait`, capped instead of overflowing.
pub(crate) fn deadline_after(wait: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(wait.min(FAR_FUTURE)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_after_saturates() {
        let now = Instant::now();
        assert_eq!(deadline_after(Duration::from_secs(2)), now + Duration::from_secs(2));
        assert_eq!(deadline_after(Duration::MAX), now + FAR_FUTURE);
    }
}
