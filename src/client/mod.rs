//! Relay client module.
//!
//! This module provides the main entry point: the [`Client`] and its
//! configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Reconnect loop, outbound queue, stop signal |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`Config`] | Resolved, immutable tunables |
//! | [`EventHandler`] | Receiver of pushed events |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Resolved configuration and defaults.
pub mod config;

/// Core client implementation.
pub mod core;

/// Event handler capability.
pub mod handler;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use config::Config;
pub use self::core::Client;
pub use handler::{EventHandler, SharedEventHandler};
