//! Client lifecycle and reconnect loop.
//!
//! The [`Client`] keeps one logical session with the relay alive across any
//! number of physical connections ("epochs").
//!
//! # Reconnect Loop
//!
//! ```text
//!          ┌─────────────────────────────────────────────┐
//!          ▼                                             │
//!   dial (retry every connect_attempt_wait)              │
//!          │                                             │
//!   Epoch::start (ReadPump + WritePump)                  │
//!          │                                             │
//!   first of ─┬─ stop()            → shutdown, return    │
//!             ├─ connection lost   → join ───────────────┤
//!             └─ reconnect_interval → join ──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay_client::{Client, Event, OutgoingMessage};
//! use serde_json::json;
//!
//! # async fn example() -> relay_client::Result<()> {
//! let client = Arc::new(
//!     Client::builder("wss://relay.example.com/connect", "ws_123")
//!         .event_handler(|event: Event| println!("event {}", event.id))
//!         .build()?,
//! );
//!
//! let runner = Arc::clone(&client);
//! let task = tokio::spawn(async move { runner.start().await });
//!
//! client
//!     .enqueue(OutgoingMessage::new("event_ack", json!({ "event_id": "evt_1" })))
//!     .await?;
//!
//! client.stop();
//! task.await.expect("client task")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::sleep;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::EpochId;
use crate::protocol::OutgoingMessage;
use crate::transport::{Dialer, Epoch, OutboundQueue, WsDialer, handshake_request};

use super::builder::ClientBuilder;
use super::config::Config;

// ============================================================================
// Client
// ============================================================================

/// Resilient relay client.
///
/// Share it behind an [`Arc`] to call [`start`](Self::start) on one task
/// while other tasks [`enqueue`](Self::enqueue) messages and eventually
/// [`stop`](Self::stop) it. A client runs once: after `start` returns it
/// cannot be restarted.
pub struct Client<D: Dialer = WsDialer> {
    /// Relay URL.
    url: String,
    /// Identity token sent in the `Websocket-Id` header.
    websocket_id: String,
    /// Resolved configuration.
    config: Config,
    /// Connection factory.
    dialer: D,
    /// Outbound queue, survives reconnects.
    queue: Arc<OutboundQueue>,
    /// Fires on `stop()`.
    done: CancellationToken,
    /// Whether an epoch is live.
    connected: AtomicBool,
    /// Set by the first `start()`.
    started: AtomicBool,
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a configuration builder for a client of the relay at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - Relay WebSocket URL (`ws://` or `wss://`)
    /// * `websocket_id` - Identity token sent in the `Websocket-Id` header
    #[inline]
    #[must_use]
    pub fn builder(url: impl Into<String>, websocket_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url, websocket_id)
    }
}

impl<D: Dialer> Client<D> {
    /// Creates a client from resolved parts.
    pub(crate) fn new(url: String, websocket_id: String, config: Config, dialer: D) -> Self {
        Self {
            url,
            websocket_id,
            config,
            dialer,
            queue: Arc::new(OutboundQueue::new()),
            done: CancellationToken::new(),
            connected: AtomicBool::new(false),
            started: AtomicBool::new(false),
        }
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl<D: Dialer> Client<D> {
    /// Returns the relay URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the identity token.
    #[inline]
    #[must_use]
    pub fn websocket_id(&self) -> &str {
        &self.websocket_id
    }

    /// Returns the resolved configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` while a connection epoch is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.done.is_cancelled()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl<D: Dialer> Client<D> {
    /// Runs the reconnect loop until [`stop`](Self::stop) is called.
    ///
    /// Dial failures and connection losses are retried indefinitely; they
    /// are logged, never returned.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if called more than once
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let mut epoch_id = EpochId::default();

        loop {
            self.connected.store(false, Ordering::SeqCst);
            debug!(url = %self.url, "Attempting to connect to relay");

            let Some(ws_stream) = self.dial_until_connected().await? else {
                debug!("Stopped before a connection was established");
                return Ok(());
            };

            epoch_id = epoch_id.next();
            let mut epoch = Epoch::start(epoch_id, ws_stream, Arc::clone(&self.queue), &self.config);
            self.connected.store(true, Ordering::SeqCst);
            info!(epoch = %epoch.id(), url = %self.url, "Connected to relay");

            tokio::select! {
                _ = self.done.cancelled() => {
                    debug!(epoch = %epoch.id(), "Stop requested");
                    epoch.shutdown(&self.queue).await;
                    self.connected.store(false, Ordering::SeqCst);
                    return Ok(());
                }

                err = epoch.connection_lost() => {
                    debug!(epoch = %epoch.id(), error = %err, "Disconnected from relay");
                    epoch.join().await;
                }

                _ = sleep(self.config.reconnect_interval()) => {
                    debug!(epoch = %epoch.id(), "Resetting the connection");
                    epoch.join().await;
                }
            }
        }
    }

    /// Requests the client to stop.
    ///
    /// Idempotent. [`start`](Self::start) closes the outbound queue, lets
    /// the active writer drain it and send a close frame, then returns.
    /// Stopped between connections, it returns at once if the queue is
    /// empty; otherwise it connects once more to flush it.
    pub fn stop(&self) {
        if !self.done.is_cancelled() {
            debug!(url = %self.url, "Stopping client");
        }
        self.done.cancel();
    }

    /// Queues a message for delivery to the relay.
    ///
    /// Waits while the queue's single slot is occupied, which is the case
    /// whenever no connection is draining it.
    ///
    /// # Errors
    ///
    /// - [`Error::QueueClosed`] if the client has been stopped
    pub async fn enqueue(&self, message: OutgoingMessage) -> Result<()> {
        self.queue.push(message).await
    }
}

// ============================================================================
// Client - Dialing
// ============================================================================

impl<D: Dialer> Client<D> {
    /// Dials until a connection succeeds or `stop()` is called.
    ///
    /// Returns `Ok(None)` when stopped with nothing left to deliver. A stop
    /// that finds accepted or requeued messages keeps dialing, so the next
    /// epoch can flush them and send a close frame.
    async fn dial_until_connected(&self) -> Result<Option<WebSocketStream<D::Stream>>> {
        let mut flushing = false;

        loop {
            let request = handshake_request(&self.url, &self.websocket_id, &self.config)?;

            let attempt = tokio::select! {
                _ = self.done.cancelled(), if !flushing => {
                    if self.stop_while_disconnected().await {
                        return Ok(None);
                    }
                    flushing = true;
                    continue;
                }
                attempt = self.dialer.dial(request) => attempt,
            };

            match attempt {
                Ok(ws_stream) => return Ok(Some(ws_stream)),
                Err(e) => {
                    debug!(error = %e, "Failed to connect to relay. Retrying...");
                }
            }

            tokio::select! {
                _ = self.done.cancelled(), if !flushing => {
                    if self.stop_while_disconnected().await {
                        return Ok(None);
                    }
                    flushing = true;
                    sleep(self.config.connect_attempt_wait()).await;
                }
                _ = sleep(self.config.connect_attempt_wait()) => {}
            }
        }
    }

    /// Closes the queue on a stop that arrived between epochs.
    ///
    /// Returns `true` if nothing is left to deliver.
    async fn stop_while_disconnected(&self) -> bool {
        let pending = self.queue.seal().await;
        if pending == 0 {
            return true;
        }

        info!(pending, "Stop requested with undelivered messages; connecting to flush them");
        false
    }
}

// ============================================================================
// Client - Display
// ============================================================================

impl<D: Dialer> fmt::Debug for Client<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("websocket_id", &self.websocket_id)
            .field("connected", &self.is_connected())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::Value;

    fn client() -> Client {
        Client::builder("ws://127.0.0.1:1/connect", "ws_test")
            .connect_attempt_wait(Duration::from_secs(1))
            .build()
            .expect("build")
    }

    #[test]
    fn test_accessors() {
        let client = client();
        assert_eq!(client.url(), "ws://127.0.0.1:1/connect");
        assert_eq!(client.websocket_id(), "ws_test");
        assert!(!client.is_connected());
        assert!(!client.is_stopped());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let client = client();
        client.stop();
        client.stop();
        assert!(client.is_stopped());
    }

    #[tokio::test]
    async fn test_start_after_stop_returns() {
        let client = client();
        client.stop();

        client.start().await.expect("start");
        assert!(!client.is_connected());

        let result = client.enqueue(OutgoingMessage::new("late", Value::Null)).await;
        assert!(matches!(result, Err(Error::QueueClosed)));
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let client = client();
        client.stop();

        client.start().await.expect("first start");
        assert!(matches!(client.start().await, Err(Error::AlreadyStarted)));
    }

    #[test]
    fn test_debug_hides_config() {
        let debug = format!("{:?}", client());
        assert!(debug.contains("ws_test"));
        assert!(debug.contains("connected"));
    }
}
