//! Per-connection state.
//!
//! An [`Epoch`] is the lifetime of one physical connection: it owns the pump
//! pair's stop tokens, the connection-lost channel and the pumps' join
//! handles. Everything here is created fresh for each successful dial, so a
//! cancelled token can never reach the pumps of a later connection.
//!
//! # Teardown
//!
//! | Method | Used for | Close frame |
//! |--------|----------|-------------|
//! | [`Epoch::join`] | connection loss, forced refresh | no |
//! | [`Epoch::shutdown`] | `Client::stop` | yes, after draining the queue |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::Config;
use crate::error::Error;
use crate::identifiers::EpochId;

use super::queue::OutboundQueue;
use super::read_pump::ReadPump;
use super::write_pump::WritePump;

// ============================================================================
// Constants
// ============================================================================

/// Both pumps may report once each.
const LOST_CHANNEL_CAPACITY: usize = 2;

// ============================================================================
// Epoch
// ============================================================================

/// One connection epoch and its two pumps.
pub(crate) struct Epoch {
    /// Sequence number, for logging.
    id: EpochId,
    /// Receives the first failure reported by either pump.
    lost_rx: mpsc::Receiver<Error>,
    /// Stops the read pump.
    stop_read: CancellationToken,
    /// Stops the write pump.
    stop_write: CancellationToken,
    /// Read pump task.
    read_task: JoinHandle<()>,
    /// Write pump task.
    write_task: JoinHandle<()>,
}

impl Epoch {
    /// Splits the connection and spawns one read pump and one write pump.
    pub(crate) fn start<S>(
        id: EpochId,
        ws_stream: WebSocketStream<S>,
        queue: Arc<OutboundQueue>,
        config: &Config,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws_stream.split();
        let (lost_tx, lost_rx) = mpsc::channel(LOST_CHANNEL_CAPACITY);
        let stop_read = CancellationToken::new();
        let stop_write = CancellationToken::new();

        let read_task = tokio::spawn(
            ReadPump {
                epoch: id,
                stream,
                stop: stop_read.clone(),
                lost_tx: lost_tx.clone(),
                pong_wait: config.pong_wait(),
                handler: Arc::clone(&config.event_handler),
            }
            .run(),
        );

        let write_task = tokio::spawn(
            WritePump {
                epoch: id,
                sink,
                queue,
                stop: stop_write.clone(),
                lost_tx,
                ping_period: config.ping_period(),
                write_wait: config.write_wait(),
            }
            .run(),
        );

        debug!(epoch = %id, "Pumps started");

        Self {
            id,
            lost_rx,
            stop_read,
            stop_write,
            read_task,
            write_task,
        }
    }

    /// Returns the epoch's sequence number.
    #[inline]
    pub(crate) fn id(&self) -> EpochId {
        self.id
    }

    /// Waits for either pump to report the connection lost.
    ///
    /// Cancel-safe.
    pub(crate) async fn connection_lost(&mut self) -> Error {
        // Both senders gone means both pumps exited without a report.
        self.lost_rx.recv().await.unwrap_or(Error::ConnectionClosed)
    }

    /// Signals both pumps to stop.
    pub(crate) fn stop(&self) {
        self.stop_read.cancel();
        self.stop_write.cancel();
    }

    /// Stops both pumps and waits until both have exited.
    ///
    /// The connection halves are dropped with the pumps, which closes the
    /// physical connection if it is still open.
    pub(crate) async fn join(self) {
        self.stop();

        let (read, write) = tokio::join!(self.read_task, self.write_task);
        Self::log_join(self.id, "read", read);
        Self::log_join(self.id, "write", write);

        debug!(epoch = %self.id, "Pumps exited");
    }

    /// Closes the queue, lets the writer drain it and send a close frame,
    /// then stops the reader and waits for both pumps.
    pub(crate) async fn shutdown(self, queue: &OutboundQueue) {
        queue.close();

        let write = self.write_task.await;
        Self::log_join(self.id, "write", write);

        self.stop_read.cancel();
        self.stop_write.cancel();
        let read = self.read_task.await;
        Self::log_join(self.id, "read", read);

        debug!(epoch = %self.id, "Pumps exited after shutdown");
    }

    fn log_join(id: EpochId, pump: &str, result: Result<(), JoinError>) {
        if let Err(e) = result {
            warn!(epoch = %id, pump, error = %e, "Pump task failed");
        }
    }
}
