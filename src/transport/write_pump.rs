//! Outbound half of a connection epoch.
//!
//! The write pump is the only task writing to the connection. Each loop
//! iteration waits on exactly one of:
//!
//! | Event | Action |
//! |-------|--------|
//! | queue item | send it as a text frame; requeue and report on failure |
//! | queue closed and drained | send a Normal close frame and exit |
//! | heartbeat tick | send a Ping |
//! | stop token | exit without a close frame |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::EpochId;
use crate::protocol::OutgoingMessage;

use super::deadline_after;
use super::queue::OutboundQueue;

// ============================================================================
// WritePump
// ============================================================================

/// Sole writer of one epoch's connection.
pub(crate) struct WritePump<S> {
    pub(crate) epoch: EpochId,
    pub(crate) sink: SplitSink<WebSocketStream<S>, Message>,
    pub(crate) queue: Arc<OutboundQueue>,
    pub(crate) stop: CancellationToken,
    pub(crate) lost_tx: mpsc::Sender<Error>,
    pub(crate) ping_period: Duration,
    pub(crate) write_wait: Duration,
}

impl<S> WritePump<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Writes until stopped, the queue closes, or a write fails.
    pub(crate) async fn run(mut self) {
        let queue = Arc::clone(&self.queue);
        let mut rx = queue.receiver().await;

        let mut ticker = interval_at(deadline_after(self.ping_period), self.ping_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                next = queue.next(&mut rx) => {
                    let Some(message) = next else {
                        self.send_close().await;
                        return;
                    };

                    if let Err(err) = self.send_message(&message).await {
                        queue.requeue(message);
                        return self.fail(err);
                    }
                }

                _ = ticker.tick() => {
                    trace!(epoch = %self.epoch, "Sending ping message");
                    if let Err(err) = self.write(Message::Ping(Default::default())).await {
                        return self.fail(err);
                    }
                }

                _ = self.stop.cancelled() => {
                    debug!(epoch = %self.epoch, "Write pump stopped");
                    return;
                }
            }
        }
    }

    /// Serializes and sends one queued message.
    async fn send_message(&mut self, message: &OutgoingMessage) -> Result<()> {
        let text = message.to_text()?;
        trace!(epoch = %self.epoch, message_id = %message.id, "Sending text message");
        self.write(Message::Text(text.into())).await
    }

    /// Sends a Normal close frame; the only path that closes the protocol.
    async fn send_close(&mut self) {
        debug!(epoch = %self.epoch, "Sending close message");

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if let Err(e) = self.write(Message::Close(Some(frame))).await {
            warn!(epoch = %self.epoch, error = %e, "Failed to send close message");
        }
    }

    /// Sends one frame within the write deadline.
    async fn write(&mut self, message: Message) -> Result<()> {
        match timeout(self.write_wait, self.sink.send(message)).await {
            Ok(sent) => Ok(sent?),
            Err(_) => Err(Error::write_timeout(self.write_wait)),
        }
    }

    /// Reports a write failure to the client loop.
    fn fail(self, err: Error) {
        if err.is_normal_close() {
            debug!(epoch = %self.epoch, error = %err, "Write failed on closed connection");
        } else {
            error!(epoch = %self.epoch, error = %err, "Write error");
        }

        let _ = self.lost_tx.try_send(err);
    }
}
