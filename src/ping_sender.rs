use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rand::Rng;

use crate::icmp::message::encode_echo_request;
use crate::icmp::timestamp::{self, TIMESTAMP_LEN};
use crate::icmp::{SequenceNumber, TSocket};
use crate::ping_error::ProbeError;
use crate::CancelToken;

/// Write side of a ping exchange: one echo request per sequence number, `delay` apart.
pub(crate) struct PingSender<S> {
    socket: Arc<S>,
    target: socket2::SockAddr,
    identifier: u16,
    payload: Vec<u8>,
}

impl<S> PingSender<S>
where
    S: TSocket + 'static,
{
    /// `payload_size` must leave room for the timestamp.
    pub(crate) fn new(socket: Arc<S>, target: IpAddr, identifier: u16, payload_size: usize) -> Self {
        let mut payload = vec![0u8; payload_size.max(TIMESTAMP_LEN)];
        rand::thread_rng().fill(&mut payload[TIMESTAMP_LEN..]);
        PingSender { socket, target: SocketAddr::new(target, 0).into(), identifier, payload }
    }

    pub(crate) fn send_one(&mut self, sequence_number: SequenceNumber) -> Result<(), ProbeError> {
        // (1) Stamp the payload.
        self.payload[..TIMESTAMP_LEN].copy_from_slice(&timestamp::encode(SystemTime::now()));

        // (2) Frame and send.
        let package = encode_echo_request(self.socket.family(), self.identifier, sequence_number, &self.payload)?;
        let sent = self.socket.send_to(&package, &self.target)?;
        if sent != package.len() {
            return Err(ProbeError::ShortWrite { sent, expected: package.len() });
        }
        tracing::trace!("echo request {sequence_number} sent ({sent} bytes)");
        Ok(())
    }

    /// Sends `count` probes. Failed probes are logged and skipped; `stop` ends the loop early.
    pub(crate) fn run(mut self, count: u16, delay: Duration, stop: &CancelToken) {
        tracing::trace!("PingSender thread start with count {count}");
        let first = u16::from(SequenceNumber::start_value());
        for sequence_number in (first..count).map(SequenceNumber::from) {
            if stop.is_cancelled() {
                break;
            }
            if let Err(error) = self.send_one(sequence_number) {
                tracing::warn!("echo request {sequence_number} skipped: {error}");
            }
            if !sequence_number.is_last(count) && stop.wait_timeout(delay) {
                break;
            }
        }
        tracing::trace!("PingSender thread end");
    }
}
