//! Inbound half of a connection epoch.
//!
//! The read pump is the only task reading from the connection. It tracks
//! the heartbeat deadline, decodes frames and hands events to the handler.
//!
//! # Liveness
//!
//! The deadline starts at `now + pong_wait` and moves forward by `pong_wait`
//! on every Pong from the relay. If nothing arrives before it passes, the
//! pump fails with [`Error::HeartbeatTimeout`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout_at;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::client::EventHandler;
use crate::error::{Error, Result};
use crate::identifiers::EpochId;
use crate::protocol::IncomingMessage;

use super::deadline_after;

// ============================================================================
// ReadPump
// ============================================================================

/// Sole reader of one epoch's connection.
pub(crate) struct ReadPump<S> {
    pub(crate) epoch: EpochId,
    pub(crate) stream: SplitStream<WebSocketStream<S>>,
    pub(crate) stop: CancellationToken,
    pub(crate) lost_tx: mpsc::Sender<Error>,
    pub(crate) pong_wait: Duration,
    pub(crate) handler: Arc<dyn EventHandler>,
}

impl<S> ReadPump<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Reads until stopped or the connection fails.
    pub(crate) async fn run(mut self) {
        let mut deadline = deadline_after(self.pong_wait);

        loop {
            let frame = tokio::select! {
                _ = self.stop.cancelled() => {
                    debug!(epoch = %self.epoch, "Read pump stopped");
                    return;
                }
                frame = timeout_at(deadline, self.stream.next()) => frame,
            };

            let message = match frame {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(e))) => return self.fail(e.into()),
                Ok(None) => return self.fail(Error::ConnectionClosed),
                Err(_) => {
                    let err = Error::heartbeat_timeout(self.pong_wait);
                    return self.fail(err);
                }
            };

            match message {
                Message::Pong(_) => {
                    trace!(epoch = %self.epoch, "Received pong message");
                    deadline = deadline_after(self.pong_wait);
                }
                Message::Text(text) => {
                    trace!(epoch = %self.epoch, message = %text.as_str(), "Incoming message");
                    self.dispatch(IncomingMessage::from_text(text.as_str()));
                }
                Message::Binary(bytes) => {
                    trace!(epoch = %self.epoch, len = bytes.len(), "Incoming binary message");
                    self.dispatch(IncomingMessage::from_bytes(&bytes));
                }
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                        None => (u16::from(CloseCode::Status), String::new()),
                    };
                    return self.fail(Error::closed(code, reason));
                }
                // Pings are answered by tungstenite on the next flush.
                Message::Ping(_) | Message::Frame(_) => {}
            }
        }
    }

    /// Hands a decoded event to the handler without blocking reads.
    fn dispatch(&self, decoded: Result<IncomingMessage>) {
        let incoming = match decoded {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!(epoch = %self.epoch, error = %e, "Received malformed message");
                return;
            }
        };

        if let Some(event) = incoming.into_event() {
            let handler = Arc::clone(&self.handler);
            tokio::task::spawn_blocking(move || handler.handle(event));
        }
    }

    /// Reports a read failure unless the epoch is already being torn down.
    fn fail(self, err: Error) {
        if self.stop.is_cancelled() {
            debug!(epoch = %self.epoch, "Read pump stopped");
            return;
        }

        if err.is_normal_close() {
            debug!(epoch = %self.epoch, error = %err, "Connection closed");
        } else {
            error!(epoch = %self.epoch, error = %err, "Read error");
        }

        let _ = self.lost_tx.try_send(err);
    }
}
