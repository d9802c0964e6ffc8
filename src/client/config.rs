//! Resolved client configuration.
//!
//! A [`Config`] is produced by [`ClientBuilder::build`](super::ClientBuilder::build)
//! with defaults applied for every unset tunable and is immutable afterwards.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::handler::SharedEventHandler;

// ============================================================================
// Constants
// ============================================================================

/// Wait between two failed dial attempts.
pub const DEFAULT_CONNECT_ATTEMPT_WAIT: Duration = Duration::from_secs(10);

/// Liveness deadline: maximum silence before the connection is declared dead.
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(10);

/// Lifetime of a single physical connection before a forced refresh.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(60);

/// Deadline for a single frame write.
pub const DEFAULT_WRITE_WAIT: Duration = Duration::from_secs(10);

/// Deadline for the WebSocket handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Subprotocol requested during the handshake.
pub const DEFAULT_SUBPROTOCOL: &str = "relay-client-v1";

/// `User-Agent` sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("relay-client/", env!("CARGO_PKG_VERSION"));

/// Returns the default ping period for a pong wait (9/10 of it).
///
/// Equal to `pong_wait` when it is shorter than 10ns, which the builder
/// rejects.
#[inline]
#[must_use]
pub fn default_ping_period(pong_wait: Duration) -> Duration {
    pong_wait - pong_wait / 10
}

// ============================================================================
// Config
// ============================================================================

/// Immutable tunables of a [`Client`](crate::Client).
#[derive(Clone)]
pub struct Config {
    pub(crate) connect_attempt_wait: Duration,
    pub(crate) pong_wait: Duration,
    pub(crate) ping_period: Duration,
    pub(crate) reconnect_interval: Duration,
    pub(crate) write_wait: Duration,
    pub(crate) handshake_timeout: Duration,
    pub(crate) unix_socket: Option<PathBuf>,
    pub(crate) no_wss: bool,
    pub(crate) subprotocols: Vec<String>,
    pub(crate) user_agent: String,
    pub(crate) client_user_agent: Option<String>,
    pub(crate) event_handler: SharedEventHandler,
}

impl Config {
    /// Wait between failed dial attempts.
    #[inline]
    #[must_use]
    pub fn connect_attempt_wait(&self) -> Duration {
        self.connect_attempt_wait
    }

    /// Heartbeat timeout (peer-liveness deadline).
    #[inline]
    #[must_use]
    pub fn pong_wait(&self) -> Duration {
        self.pong_wait
    }

    /// Heartbeat send interval.
    #[inline]
    #[must_use]
    pub fn ping_period(&self) -> Duration {
        self.ping_period
    }

    /// Forced-reconnect interval.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    /// Per-write deadline.
    #[inline]
    #[must_use]
    pub fn write_wait(&self) -> Duration {
        self.write_wait
    }

    /// Handshake deadline.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Unix socket used instead of a network connection, if any.
    #[inline]
    #[must_use]
    pub fn unix_socket(&self) -> Option<&Path> {
        self.unix_socket.as_deref()
    }

    /// Whether `wss://` URLs are downgraded to `ws://`.
    #[inline]
    #[must_use]
    pub fn no_wss(&self) -> bool {
        self.no_wss
    }

    /// Subprotocols requested during the handshake.
    #[inline]
    #[must_use]
    pub fn subprotocols(&self) -> &[String] {
        &self.subprotocols
    }

    /// `User-Agent` header value.
    #[inline]
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `X-Client-User-Agent` header value, if any.
    #[inline]
    #[must_use]
    pub fn client_user_agent(&self) -> Option<&str> {
        self.client_user_agent.as_deref()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("connect_attempt_wait", &self.connect_attempt_wait)
            .field("pong_wait", &self.pong_wait)
            .field("ping_period", &self.ping_period)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("write_wait", &self.write_wait)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("unix_socket", &self.unix_socket)
            .field("no_wss", &self.no_wss)
            .field("subprotocols", &self.subprotocols)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_CONNECT_ATTEMPT_WAIT.as_secs(), 10);
        assert_eq!(DEFAULT_PONG_WAIT.as_secs(), 10);
        assert_eq!(DEFAULT_RECONNECT_INTERVAL.as_secs(), 60);
        assert_eq!(DEFAULT_WRITE_WAIT.as_secs(), 10);
        assert_eq!(default_ping_period(DEFAULT_PONG_WAIT), Duration::from_secs(9));
    }

    #[test]
    fn test_user_agent_has_version() {
        assert!(DEFAULT_USER_AGENT.starts_with("relay-client/"));
    }

    #[test]
    fn test_default_ping_period_extremes() {
        assert_eq!(default_ping_period(Duration::from_nanos(9)), Duration::from_nanos(9));
        assert_eq!(default_ping_period(Duration::from_nanos(10)), Duration::from_nanos(9));
        assert!(default_ping_period(Duration::MAX) < Duration::MAX);
    }

    proptest! {
        #[test]
        fn default_ping_period_precedes_pong_wait(millis in 10u64..86_400_000) {
            let pong_wait = Duration::from_millis(millis);
            let ping_period = default_ping_period(pong_wait);
            prop_assert!(ping_period < pong_wait);
            prop_assert!(!ping_period.is_zero());
        }

        #[test]
        fn default_ping_period_never_overflows(secs in any::<u64>(), nanos in 10u32..1_000_000_000) {
            let pong_wait = Duration::new(secs, nanos);
            prop_assert!(default_ping_period(pong_wait) < pong_wait);
        }
    }
}
