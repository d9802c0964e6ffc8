//! Error types for the relay client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use relay_client::{Client, OutgoingMessage, Result};
//!
//! async fn reply(client: &Client) -> Result<()> {
//!     client.enqueue(OutgoingMessage::new("ack", serde_json::json!({}))).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::AlreadyStarted`] |
//! | Connection | [`Error::Connection`], [`Error::HandshakeTimeout`], [`Error::ConnectionClosed`], [`Error::Closed`] |
//! | Liveness | [`Error::HeartbeatTimeout`], [`Error::WriteTimeout`] |
//! | Queue | [`Error::QueueClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// No variant is fatal to a running client: connection errors end the
/// current epoch and the client reconnects.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`ClientBuilder::build`](crate::ClientBuilder::build) when
    /// a tunable is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// `start()` was called while the client is already running.
    #[error("Client already started")]
    AlreadyStarted,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Dialing the relay failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The WebSocket handshake did not complete in time.
    #[error("Handshake timeout after {timeout_ms}ms")]
    HandshakeTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The peer sent a close frame.
    #[error("Connection closed by peer: code={code}, reason={reason}")]
    Closed {
        /// Close code sent by the peer (1005 when none was given).
        code: u16,
        /// Close reason sent by the peer.
        reason: String,
    },

    /// The stream ended without a close frame.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Liveness Errors
    // ========================================================================
    /// No heartbeat acknowledgment arrived before the liveness deadline.
    #[error("Heartbeat timeout after {timeout_ms}ms")]
    HeartbeatTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A single write exceeded the write deadline.
    #[error("Write timeout after {timeout_ms}ms")]
    WriteTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// The outbound queue was closed by `stop()`.
    #[error("Outbound queue closed")]
    QueueClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a handshake timeout error.
    #[inline]
    pub fn handshake_timeout(timeout: Duration) -> Self {
        Self::HandshakeTimeout {
            timeout_ms: saturating_millis(timeout),
        }
    }

    /// Creates a heartbeat timeout error.
    #[inline]
    pub fn heartbeat_timeout(timeout: Duration) -> Self {
        Self::HeartbeatTimeout {
            timeout_ms: saturating_millis(timeout),
        }
    }

    /// Creates a write timeout error.
    #[inline]
    pub fn write_timeout(timeout: Duration) -> Self {
        Self::WriteTimeout {
            timeout_ms: saturating_millis(timeout),
        }
    }

    /// Creates a peer close error.
    #[inline]
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
        }
    }
}

/// Milliseconds in `duration`, clamped to `u64::MAX`.
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::HeartbeatTimeout { .. } | Self::WriteTimeout { .. }
        )
    }

    /// Returns `true` if this error ends a connection epoch.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::HandshakeTimeout { .. }
                | Self::HeartbeatTimeout { .. }
                | Self::WriteTimeout { .. }
                | Self::Closed { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if the connection ended in an ordinary way.
    ///
    /// Ordinary closes are logged at debug level; everything else that ends
    /// an epoch is an unexpected close and is logged as an error.
    #[must_use]
    pub fn is_normal_close(&self) -> bool {
        match self {
            Self::Closed { code, .. } => *code == u16::from(CloseCode::Normal),
            Self::ConnectionClosed => true,
            Self::WebSocket(err) => matches!(err, WsError::ConnectionClosed | WsError::AlreadyClosed),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_closed_display() {
        let err = Error::closed(1001, "going away");
        assert_eq!(
            err.to_string(),
            "Connection closed by peer: code=1001, reason=going away"
        );
    }

    #[test]
    fn test_is_timeout() {
        let ten_secs = Duration::from_secs(10);
        assert!(Error::heartbeat_timeout(ten_secs).is_timeout());
        assert!(Error::write_timeout(ten_secs).is_timeout());
        assert!(Error::handshake_timeout(ten_secs).is_timeout());
        assert!(!Error::connection("test").is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::heartbeat_timeout(Duration::from_millis(1)).is_connection_error());
        assert!(!Error::QueueClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_normal_close() {
        assert!(Error::closed(1000, "").is_normal_close());
        assert!(Error::ConnectionClosed.is_normal_close());
        assert!(Error::WebSocket(WsError::ConnectionClosed).is_normal_close());

        assert!(!Error::closed(1006, "").is_normal_close());
        assert!(!Error::closed(1005, "").is_normal_close());
        assert!(!Error::heartbeat_timeout(Duration::from_millis(1)).is_normal_close());
    }

    #[test]
    fn test_timeout_millis() {
        let err = Error::write_timeout(Duration::from_millis(2500));
        assert!(matches!(err, Error::WriteTimeout { timeout_ms: 2500 }));

        let err = Error::heartbeat_timeout(Duration::MAX);
        assert!(matches!(err, Error::HeartbeatTimeout { timeout_ms: u64::MAX }));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_normal_close());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
