//! Outbound message queue shared across connection epochs.
//!
//! The queue is a capacity-1 handoff channel: a caller's `push` completes
//! once the message is buffered, and further pushes wait until the active
//! write pump drains it. Nothing is buffered beyond that single slot, so
//! back-pressure lands on producers while the client is disconnected.
//!
//! A message whose write failed is put back through [`OutboundQueue::requeue`]
//! and is served before anything still in the channel.
//!
//! # Closing
//!
//! [`OutboundQueue::close`] is one-way. After it:
//!
//! - pending and future pushes fail with [`Error::QueueClosed`]
//! - the consumer closes the channel, drains what is buffered or already
//!   holds a send permit, then sees `None`
//! - requeues are dropped with a warning
//!
//! A push that passed the closed check is therefore either delivered to the
//! consumer or fails; it is never accepted and then stranded.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::protocol::OutgoingMessage;

// ============================================================================
// OutboundQueue
// ============================================================================

/// The client's outbound queue.
pub(crate) struct OutboundQueue {
    /// Producer side, used by `push`.
    tx: mpsc::Sender<OutgoingMessage>,
    /// Consumer side, held by the active write pump for its whole epoch.
    rx: AsyncMutex<mpsc::Receiver<OutgoingMessage>>,
    /// Messages whose write failed, served first.
    requeued: Mutex<VecDeque<OutgoingMessage>>,
    /// Fires once the queue is closed.
    closed: CancellationToken,
}

/// Exclusive consumer access for one write pump.
pub(crate) type QueueReceiver<'a> = MutexGuard<'a, mpsc::Receiver<OutgoingMessage>>;

impl OutboundQueue {
    /// Creates an open, empty queue.
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: AsyncMutex::new(rx),
            requeued: Mutex::new(VecDeque::new()),
            closed: CancellationToken::new(),
        }
    }

    /// Submits a message, waiting while the slot is occupied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the queue is or becomes closed
    /// before the message is accepted.
    pub(crate) async fn push(&self, message: OutgoingMessage) -> Result<()> {
        if self.is_closed() {
            return Err(Error::QueueClosed);
        }

        let id = message.id;
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(Error::QueueClosed),
            sent = self.tx.send(message) => {
                sent.map_err(|_| Error::QueueClosed)?;
                trace!(message_id = %id, "Message queued");
                Ok(())
            }
        }
    }

    /// Puts back a message whose write failed.
    ///
    /// Returns `false` and drops the message if the queue is already closed.
    pub(crate) fn requeue(&self, message: OutgoingMessage) -> bool {
        if self.is_closed() {
            warn!(message_id = %message.id, "Queue closed, dropping requeued message");
            return false;
        }

        trace!(message_id = %message.id, "Message requeued");
        self.requeued.lock().push_back(message);
        true
    }

    /// Acquires the consumer side.
    ///
    /// Only one write pump is alive at a time, so this never waits in
    /// practice.
    pub(crate) async fn receiver(&self) -> QueueReceiver<'_> {
        self.rx.lock().await
    }

    /// Returns the next message to write.
    ///
    /// Requeued messages come first. Returns `None` once the queue is closed
    /// and nothing is left to drain.
    pub(crate) async fn next(&self, rx: &mut QueueReceiver<'_>) -> Option<OutgoingMessage> {
        if let Some(message) = self.requeued.lock().pop_front() {
            return Some(message);
        }

        tokio::select! {
            biased;
            message = rx.recv() => message,
            _ = self.closed.cancelled() => {
                // Rejects new sends; in-flight permits still land.
                rx.close();
                rx.recv().await
            }
        }
    }

    /// Closes the queue with no writer attached.
    ///
    /// Everything accepted so far moves behind the requeued messages, so a
    /// later writer still delivers it before seeing `None`. Returns the
    /// number of undelivered messages.
    pub(crate) async fn seal(&self) -> usize {
        self.close();

        let mut rx = self.receiver().await;
        rx.close();
        while let Some(message) = rx.recv().await {
            self.requeued.lock().push_back(message);
        }

        self.requeued.lock().len()
    }

    /// Closes the queue.
    pub(crate) fn close(&self) {
        self.closed.cancel();
    }

    /// Returns `true` once the queue is closed.
    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

// ============================================================================
// Tests
// ============================================================================
