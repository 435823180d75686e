use std::io;
use std::sync::Arc;

use crate::icmp::message::{decode_message, EchoBody, IcmpMessage, MessageBody};
use crate::icmp::timestamp;
use crate::icmp::{Datagram, IpFamily, TSocket};
use crate::ping_replies::PingReplySender;
use crate::{CancelToken, PingReply, PingReplyData, ReplyError};

/// What one received datagram amounts to.
#[derive(Debug)]
pub(crate) enum Inbound {
    Reply(PingReply),
    /// One of our own echo requests, looped back to a raw socket. Not an answer to anything.
    OwnProbe,
}

/// Read side of a ping exchange: turns inbound datagrams into replies.
pub(crate) struct PingReceiver<S> {
    socket: Arc<S>,
    identifier: u16,
    buf: Vec<u8>,
}

impl<S> PingReceiver<S>
where
    S: TSocket + 'static,
{
    pub(crate) fn new(socket: Arc<S>, identifier: u16, buffer_size: usize) -> Self {
        PingReceiver { socket, identifier, buf: vec![0u8; buffer_size] }
    }

    /// Blocks until the next inbound event and classifies it. `None` once `stop` is cancelled.
    pub(crate) fn receive(&mut self, stop: &CancelToken) -> Option<PingReply> {
        loop {
            if stop.is_cancelled() {
                return None;
            }
            match self.socket.recv_from(&mut self.buf) {
                Err(e) if is_poll_timeout(&e) => continue,
                Err(e) => {
                    tracing::warn!("receive error: {e}");
                    return Some(PingReply::Error(ReplyError::Receive(e)));
                }
                Ok(datagram) => {
                    let bytes = &self.buf[..datagram.size];
                    match classify(self.socket.family(), self.identifier, bytes, &datagram) {
                        Inbound::OwnProbe => {
                            tracing::debug!("skipping own echo request from {}", datagram.source);
                        }
                        Inbound::Reply(reply) => {
                            tracing::trace!("received {} bytes from {}", datagram.size, datagram.source);
                            return Some(reply);
                        }
                    }
                }
            }
        }
    }

    /// Publishes exactly `count` replies unless `stop` is cancelled or the consumer goes away.
    /// Cancels `stop` on the way out so the sender ends too. Returns the number published.
    pub(crate) fn run(mut self, count: u16, replies_tx: &PingReplySender, stop: &CancelToken) -> u16 {
        tracing::trace!("PingReceiver thread start with count {count}");
        let mut received: u16 = 0;
        while received < count {
            let Some(reply) = self.receive(stop) else {
                tracing::trace!("PingReceiver stopped after {received} of {count} replies");
                break;
            };
            if replies_tx.send(reply).is_err() {
                tracing::trace!("reply consumer gone");
                break;
            }
            received += 1;
        }
        stop.cancel();
        tracing::trace!("PingReceiver thread end");
        received
    }
}

fn is_poll_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Decodes one datagram. Echo replies are not matched against identifier or sequence number.
pub(crate) fn classify(family: IpFamily, identifier: u16, bytes: &[u8], datagram: &Datagram) -> Inbound {
    let message = match decode_message(bytes, family) {
        Ok(message) => message,
        Err(e) => return Inbound::Reply(ReplyError::Decode(e).into()),
    };
    let is_reply = message.is_echo_reply(family);
    let is_request = message.is_echo_request(family);
    let IcmpMessage { icmp_type, code, body } = message;

    match body {
        MessageBody::Echo(echo) if is_reply => Inbound::Reply(echo_reply(echo, datagram)),
        MessageBody::Echo(echo) if is_request && echo.identifier == identifier => Inbound::OwnProbe,
        _ => Inbound::Reply(ReplyError::UnknownReply { icmp_type, code }.into()),
    }
}

fn echo_reply(echo: EchoBody, datagram: &Datagram) -> PingReply {
    match timestamp::decode(&echo.data) {
        Err(e) => ReplyError::CorruptedReply(e).into(),
        Ok(sent) => PingReply::Echo(PingReplyData {
            source: datagram.source,
            sequence_number: echo.sequence_number,
            hop_count: datagram.hop_count,
            rtt: timestamp::elapsed_since(sent),
            size: datagram.size,
        }),
    }
}
