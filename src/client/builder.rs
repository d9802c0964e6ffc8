//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use relay_client::Client;
//!
//! # fn example() -> relay_client::Result<()> {
//! let client = Client::builder("wss://relay.example.com/connect", "ws_123")
//!     .pong_wait(Duration::from_secs(20))
//!     .reconnect_interval(Duration::from_secs(120))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Dialer, WsDialer, handshake_request};

use super::config::{
    Config, DEFAULT_CONNECT_ATTEMPT_WAIT, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_PONG_WAIT,
    DEFAULT_RECONNECT_INTERVAL, DEFAULT_SUBPROTOCOL, DEFAULT_USER_AGENT, DEFAULT_WRITE_WAIT,
    default_ping_period,
};
use super::core::Client;
use super::handler::{EventHandler, SharedEventHandler, noop_handler};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder. Every tunable left
/// unset falls back to its default when [`build`](Self::build) runs.
#[derive(Clone)]
pub struct ClientBuilder {
    url: String,
    websocket_id: String,
    connect_attempt_wait: Option<Duration>,
    pong_wait: Option<Duration>,
    ping_period: Option<Duration>,
    reconnect_interval: Option<Duration>,
    write_wait: Option<Duration>,
    handshake_timeout: Option<Duration>,
    unix_socket: Option<PathBuf>,
    no_wss: bool,
    subprotocols: Option<Vec<String>>,
    user_agent: Option<String>,
    client_user_agent: Option<String>,
    event_handler: Option<SharedEventHandler>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("websocket_id", &self.websocket_id)
            .field("pong_wait", &self.pong_wait)
            .field("ping_period", &self.ping_period)
            .field("unix_socket", &self.unix_socket)
            .field("no_wss", &self.no_wss)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder for the relay at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - Relay WebSocket URL (`ws://` or `wss://`)
    /// * `websocket_id` - Identity token sent in the `Websocket-Id` header
    #[must_use]
    pub fn new(url: impl Into<String>, websocket_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            websocket_id: websocket_id.into(),
            connect_attempt_wait: None,
            pong_wait: None,
            ping_period: None,
            reconnect_interval: None,
            write_wait: None,
            handshake_timeout: None,
            unix_socket: None,
            no_wss: false,
            subprotocols: None,
            user_agent: None,
            client_user_agent: None,
            event_handler: None,
        }
    }

    /// Sets the wait between failed dial attempts.
    #[inline]
    #[must_use]
    pub fn connect_attempt_wait(mut self, wait: Duration) -> Self {
        self.connect_attempt_wait = Some(wait);
        self
    }

    /// Sets the heartbeat timeout.
    ///
    /// Unless [`ping_period`](Self::ping_period) is set, pings are sent every
    /// 9/10 of this duration.
    #[inline]
    #[must_use]
    pub fn pong_wait(mut self, wait: Duration) -> Self {
        self.pong_wait = Some(wait);
        self
    }

    /// Sets the heartbeat send interval.
    ///
    /// Must be shorter than the heartbeat timeout.
    #[inline]
    #[must_use]
    pub fn ping_period(mut self, period: Duration) -> Self {
        self.ping_period = Some(period);
        self
    }

    /// Sets the forced-reconnect interval.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = Some(interval);
        self
    }

    /// Sets the per-write deadline.
    #[inline]
    #[must_use]
    pub fn write_wait(mut self, wait: Duration) -> Self {
        self.write_wait = Some(wait);
        self
    }

    /// Sets the handshake deadline used by the default dialer.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Connects through a Unix domain socket instead of the network.
    ///
    /// The URL is still used for the handshake's `Host` header and path.
    #[inline]
    #[must_use]
    pub fn unix_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.unix_socket = Some(path.into());
        self
    }

    /// Forces plaintext `ws://` even when the URL says `wss://`.
    #[inline]
    #[must_use]
    pub fn no_wss(mut self, no_wss: bool) -> Self {
        self.no_wss = no_wss;
        self
    }

    /// Replaces the subprotocols requested during the handshake.
    #[must_use]
    pub fn subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subprotocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the `User-Agent` header.
    #[inline]
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the `X-Client-User-Agent` header.
    #[inline]
    #[must_use]
    pub fn client_user_agent(mut self, client_user_agent: impl Into<String>) -> Self {
        self.client_user_agent = Some(client_user_agent.into());
        self
    }

    /// Sets the handler receiving pushed events.
    #[inline]
    #[must_use]
    pub fn event_handler(mut self, handler: impl EventHandler) -> Self {
        self.event_handler = Some(Arc::new(handler));
        self
    }

    /// Builds a client using the default WebSocket dialer.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL, a header value or a tunable is invalid
    pub fn build(self) -> Result<Client<WsDialer>> {
        let (url, websocket_id, config) = self.resolve()?;
        let dialer = WsDialer::from_config(&config);
        Ok(Client::new(url, websocket_id, config, dialer))
    }

    /// Builds a client that dials through `dialer`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL, a header value or a tunable is invalid
    pub fn build_with_dialer<D: Dialer>(self, dialer: D) -> Result<Client<D>> {
        let (url, websocket_id, config) = self.resolve()?;
        Ok(Client::new(url, websocket_id, config, dialer))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Applies defaults and validates the result.
    fn resolve(self) -> Result<(String, String, Config)> {
        Self::validate_url(&self.url)?;

        let pong_wait = self.pong_wait.unwrap_or(DEFAULT_PONG_WAIT);
        let ping_period = match self.ping_period {
            Some(period) => period,
            None => Self::derive_ping_period(pong_wait)?,
        };

        let config = Config {
            connect_attempt_wait: self
                .connect_attempt_wait
                .unwrap_or(DEFAULT_CONNECT_ATTEMPT_WAIT),
            pong_wait,
            ping_period,
            reconnect_interval: self.reconnect_interval.unwrap_or(DEFAULT_RECONNECT_INTERVAL),
            write_wait: self.write_wait.unwrap_or(DEFAULT_WRITE_WAIT),
            handshake_timeout: self.handshake_timeout.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT),
            unix_socket: self.unix_socket,
            no_wss: self.no_wss,
            subprotocols: self
                .subprotocols
                .unwrap_or_else(|| vec![DEFAULT_SUBPROTOCOL.to_string()]),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            client_user_agent: self.client_user_agent,
            event_handler: self.event_handler.unwrap_or_else(noop_handler),
        };

        Self::validate_durations(&config)?;

        // Header values are fixed for the client's lifetime; reject bad ones now.
        handshake_request(&self.url, &self.websocket_id, &config)?;

        Ok((self.url, self.websocket_id, config))
    }

    /// Validates the relay URL.
    fn validate_url(url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid relay URL '{url}': {e}")))?;

        match parsed.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(Error::config(format!(
                "Unsupported URL scheme '{other}'. Use ws:// or wss://"
            ))),
        }
    }

    /// Derives the ping period when only `pong_wait` was configured.
    fn derive_ping_period(pong_wait: Duration) -> Result<Duration> {
        if pong_wait.is_zero() {
            return Err(Error::config("pong_wait must be greater than zero"));
        }

        let ping_period = default_ping_period(pong_wait);
        if ping_period >= pong_wait {
            return Err(Error::config(format!(
                "pong_wait ({pong_wait:?}) is too short to derive a ping period"
            )));
        }

        Ok(ping_period)
    }

    /// Validates the timing tunables.
    fn validate_durations(config: &Config) -> Result<()> {
        let named = [
            ("connect_attempt_wait", config.connect_attempt_wait),
            ("pong_wait", config.pong_wait),
            ("ping_period", config.ping_period),
            ("reconnect_interval", config.reconnect_interval),
            ("write_wait", config.write_wait),
            ("handshake_timeout", config.handshake_timeout),
        ];

        if let Some((name, _)) = named.iter().find(|(_, value)| value.is_zero()) {
            return Err(Error::config(format!("{name} must be greater than zero")));
        }

        if config.ping_period >= config.pong_wait {
            return Err(Error::config(format!(
                "ping_period ({:?}) must be shorter than pong_wait ({:?})",
                config.ping_period, config.pong_wait
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "wss://relay.example.com/connect";

    #[test]
    fn test_defaults_applied() {
        let (_, _, config) = ClientBuilder::new(URL, "ws_1").resolve().expect("resolve");

        assert_eq!(config.connect_attempt_wait(), DEFAULT_CONNECT_ATTEMPT_WAIT);
        assert_eq!(config.pong_wait(), DEFAULT_PONG_WAIT);
        assert_eq!(config.ping_period(), Duration::from_secs(9));
        assert_eq!(config.reconnect_interval(), DEFAULT_RECONNECT_INTERVAL);
        assert_eq!(config.write_wait(), DEFAULT_WRITE_WAIT);
        assert_eq!(config.subprotocols(), [DEFAULT_SUBPROTOCOL.to_string()]);
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
        assert!(config.unix_socket().is_none());
        assert!(!config.no_wss());
    }

    #[test]
    fn test_ping_period_follows_pong_wait() {
        let (_, _, config) = ClientBuilder::new(URL, "ws_1")
            .pong_wait(Duration::from_secs(30))
            .resolve()
            .expect("resolve");

        assert_eq!(config.ping_period(), Duration::from_secs(27));
    }

    #[test]
    fn test_explicit_values_kept() {
        let (url, id, config) = ClientBuilder::new(URL, "ws_1")
            .connect_attempt_wait(Duration::from_secs(1))
            .pong_wait(Duration::from_secs(5))
            .ping_period(Duration::from_secs(2))
            .reconnect_interval(Duration::from_secs(30))
            .write_wait(Duration::from_secs(3))
            .unix_socket("/tmp/relay.sock")
            .no_wss(true)
            .client_user_agent("cli/1.0")
            .resolve()
            .expect("resolve");

        assert_eq!(url, URL);
        assert_eq!(id, "ws_1");
        assert_eq!(config.ping_period(), Duration::from_secs(2));
        assert_eq!(config.unix_socket(), Some(std::path::Path::new("/tmp/relay.sock")));
        assert!(config.no_wss());
        assert_eq!(config.client_user_agent(), Some("cli/1.0"));
    }

    #[test]
    fn test_ping_period_must_precede_pong_wait() {
        let result = ClientBuilder::new(URL, "ws_1")
            .pong_wait(Duration::from_secs(5))
            .ping_period(Duration::from_secs(5))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("ping_period"));
    }

    #[test]
    fn test_tiny_pong_wait_reported_against_pong_wait() {
        let err = ClientBuilder::new(URL, "ws_1")
            .pong_wait(Duration::from_nanos(5))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pong_wait"));
        assert!(!err.to_string().contains("ping_period"));

        let err = ClientBuilder::new(URL, "ws_1")
            .pong_wait(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pong_wait must be greater than zero"));
    }

    #[test]
    fn test_huge_pong_wait_accepted() {
        let config = ClientBuilder::new(URL, "ws_1")
            .pong_wait(Duration::MAX)
            .resolve()
            .expect("resolve")
            .2;
        assert!(config.ping_period() < config.pong_wait());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let result = ClientBuilder::new(URL, "ws_1")
            .write_wait(Duration::ZERO)
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("write_wait"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ClientBuilder::new("not a url", "ws_1").build().is_err());
        assert!(ClientBuilder::new("http://relay.example.com", "ws_1").build().is_err());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = ClientBuilder::new(URL, "ws\n1").build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ClientBuilder::new(URL, "ws_1").no_wss(true);
        let cloned = builder.clone();
        assert_eq!(builder.url, cloned.url);
        assert_eq!(builder.no_wss, cloned.no_wss);
    }
}
