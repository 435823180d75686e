use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::{CancelToken, PingError, PingReply, PingResult};

pub(crate) type PingReplySender = mpsc::SyncSender<PingReply>;
pub(crate) type PingReplyReceiver = mpsc::Receiver<PingReply>;

/// Rendezvous channel: the receiver thread blocks until the consumer takes each reply.
pub(crate) fn ping_reply_channel() -> (PingReplySender, PingReplyReceiver) {
    mpsc::sync_channel(0)
}

/// Stream of replies of one ping exchange.
///
/// Yields one [`PingReply`] per inbound event and ends after `count` of them, or earlier when the
/// exchange is cancelled. Dropping the stream stops both worker threads and waits for them.
///
/// The iterator ends the same way in both cases. Call [`halt`](PingReplies::halt) after it is
/// exhausted to tell them apart: it returns [`PingError::Cancelled`] for a cancelled exchange.
pub struct PingReplies {
    replies_rx: Option<PingReplyReceiver>,
    cancel: CancelToken,
    stop: CancelToken,
    sender_thread: Option<JoinHandle<()>>,
    receiver_thread: Option<JoinHandle<u16>>,
    count: u16,
}

impl PingReplies {
    pub(crate) fn new(
        replies_rx: PingReplyReceiver,
        cancel: CancelToken,
        stop: CancelToken,
        sender_thread: JoinHandle<()>,
        receiver_thread: JoinHandle<u16>,
        count: u16,
    ) -> Self {
        PingReplies {
            replies_rx: Some(replies_rx),
            cancel,
            stop,
            sender_thread: Some(sender_thread),
            receiver_thread: Some(receiver_thread),
            count,
        }
    }

    /// A finished exchange without workers, for `count == 0`.
    pub(crate) fn empty(cancel: CancelToken) -> Self {
        PingReplies {
            replies_rx: None,
            stop: cancel.child(),
            cancel,
            sender_thread: None,
            receiver_thread: None,
            count: 0,
        }
    }

    /// Stops the exchange and waits for the worker threads.
    ///
    /// Fails with [`PingError::Cancelled`] if the caller's token was cancelled before all
    /// `count` replies were published.
    pub fn halt(mut self) -> PingResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> PingResult<()> {
        self.stop.cancel();
        // Unblocks a receiver thread waiting for the consumer.
        drop(self.replies_rx.take());

        let sender_result = match self.sender_thread.take() {
            Some(handle) => handle.join().map_err(|_| PingError::WorkerPanicked),
            None => Ok(()),
        };
        let receiver_result = match self.receiver_thread.take() {
            Some(handle) => handle.join().map_err(|_| PingError::WorkerPanicked),
            None => Ok(self.count),
        };
        sender_result?;
        let received = receiver_result?;

        if received < self.count && self.cancel.is_cancelled() {
            tracing::debug!("ping cancelled after {received} of {} replies", self.count);
            return Err(PingError::Cancelled);
        }
        Ok(())
    }
}

impl Iterator for PingReplies {
    type Item = PingReply;

    fn next(&mut self) -> Option<Self::Item> {
        self.replies_rx.as_ref()?.recv().ok()
    }
}

impl Drop for PingReplies {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            tracing::trace!("ping stream dropped: {error}");
        }
    }
}
