//! Relay Client - Resilient bidirectional WebSocket client.
//!
//! This library keeps a long-lived logical session with a remote relay over
//! an unreliable network. It receives events pushed by the relay and hands
//! them to application code, and it delivers outbound messages queued by the
//! caller, reconnecting transparently whenever the physical connection dies.
//!
//! # Architecture
//!
//! - **Client**: reconnect loop; owns the outbound queue and stop signal
//! - **Epoch**: one physical connection with exactly one reader and one writer
//! - **ReadPump**: heartbeat deadline, frame decoding, event dispatch
//! - **WritePump**: queued messages, periodic pings, graceful close
//!
//! Key design principles:
//!
//! - Stop tokens and the connection-lost channel are scoped to one epoch
//! - Both pumps exit before the next connection is dialed
//! - A message whose write failed is resent first on the next connection
//! - Every connection is refreshed after `reconnect_interval`, healthy or not
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay_client::{Client, Event, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(
//!         Client::builder("wss://relay.example.com/connect", "ws_123")
//!             .event_handler(|event: Event| println!("event: {}", event.event_type))
//!             .build()?,
//!     );
//!
//!     let runner = Arc::clone(&client);
//!     tokio::spawn(async move { runner.start().await });
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.stop();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientBuilder`], [`Config`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | JSON message envelopes |
//! | [`transport`] | Dialer, epochs and pumps |

// ============================================================================
// Modules
// ============================================================================

/// Client lifecycle and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for messages and epochs.
pub mod identifiers;

/// Relay protocol message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Exposes the [`Dialer`] seam; epochs and pumps are internal.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, Config, EventHandler};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{EpochId, MessageId};

// Protocol types
pub use protocol::{Event, IncomingMessage, OutgoingMessage};

// Transport types
pub use transport::{Dialer, WsDialer};
