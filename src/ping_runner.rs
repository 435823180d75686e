use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::icmp::message::ECHO_HEADER_LEN;
use crate::icmp::{IpFamily, Socket, TSocket};
use crate::ping_receiver::PingReceiver;
use crate::ping_replies::{ping_reply_channel, PingReplies};
use crate::ping_sender::PingSender;
use crate::{CancelToken, PingRequest, PingResult};

// Largest IPv4 header; raw IPv4 sockets deliver it in front of the ICMP message.
const MAX_IP_HEADER_LEN: usize = 60;
const MIN_RECEIVE_BUFFER_LEN: usize = 1500;
// A zero socket read timeout blocks forever, so does anything socket2 rounds down to zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SocketType {
    /// Unprivileged ICMP datagram socket (Linux: `net.ipv4.ping_group_range`).
    #[default]
    Dgram,
    /// Raw ICMP socket, needs `CAP_NET_RAW`.
    Raw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PingConfig {
    pub socket_type: SocketType,
    /// Read timeout of the socket: upper bound for noticing cancellation while no reply arrives.
    /// Values below one millisecond are raised to one millisecond.
    pub poll_interval: Duration,
}

impl PingConfig {
    /// `poll_interval` as applied to the socket.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        PingConfig { socket_type: SocketType::default(), poll_interval: Duration::from_millis(100) }
    }
}

/// Starts a ping exchange and returns the stream of its replies.
///
/// Opens one socket of the target's family and spawns a sender and a receiver thread on it. The
/// returned stream yields exactly `request.count` replies unless `cancel` is cancelled first.
/// Setup failures are returned before any thread starts.
pub fn send(request: &PingRequest, config: &PingConfig, cancel: &CancelToken) -> PingResult<PingReplies> {
    let target = request.resolved_target()?;
    if request.count == 0 {
        return Ok(PingReplies::empty(cancel.clone()));
    }
    let socket = Socket::new(config.socket_type, IpFamily::of(target), config.effective_poll_interval())?;
    Ok(send_with_socket(request, target, socket, cancel))
}

fn send_with_socket<S>(request: &PingRequest, target: IpAddr, socket: S, cancel: &CancelToken) -> PingReplies
where
    S: TSocket + 'static,
{
    let identifier = echo_identifier();
    let payload_size = request.effective_size();
    let buffer_size = MIN_RECEIVE_BUFFER_LEN.max(payload_size + ECHO_HEADER_LEN + MAX_IP_HEADER_LEN);
    tracing::trace!(
        "ping {target} over {}: count {}, payload {payload_size} bytes, identifier {identifier:#06x}",
        socket.family(),
        request.count
    );

    let socket = Arc::new(socket);
    let stop = cancel.child();
    let (replies_tx, replies_rx) = ping_reply_channel();

    let ping_sender = PingSender::new(socket.clone(), target, identifier, payload_size);
    let ping_receiver = PingReceiver::new(socket, identifier, buffer_size);

    let (count, delay) = (request.count, request.delay);
    let sender_stop = stop.clone();
    let sender_thread = std::thread::spawn(move || ping_sender.run(count, delay, &sender_stop));
    let receiver_stop = stop.clone();
    let receiver_thread = std::thread::spawn(move || ping_receiver.run(count, &replies_tx, &receiver_stop));

    PingReplies::new(replies_rx, cancel.clone(), stop, sender_thread, receiver_thread, count)
}

#[allow(clippy::cast_possible_truncation)]
fn echo_identifier() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::socket::tests::{Inbound, OnReceive, OnSend, SocketMock};
    use crate::icmp::{HopCount, SequenceNumber};
    use crate::{PingError, PingReply, ReplyError};
    use more_asserts::assert_lt;
    use std::collections::BTreeSet;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Instant;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn request(count: u16, delay: Duration) -> PingRequest {
        PingRequest { count, delay, ..PingRequest::new(LOCALHOST) }
    }

    #[test]
    fn ping_localhost_succeeds() {
        let socket = SocketMock::new_default();
        let cancel = CancelToken::new();

        let mut replies = send_with_socket(&request(4, Duration::ZERO), LOCALHOST, socket.clone(), &cancel);
        let replies_vec: Vec<PingReply> = replies.by_ref().collect();

        assert_eq!(4, replies_vec.len());
        let mut sequence_numbers = BTreeSet::new();
        for reply in &replies_vec {
            let data = reply.data().unwrap();
            assert_eq!(LOCALHOST, data.source);
            assert_eq!(Some(HopCount(64)), data.hop_count);
            assert_eq!(8 + 64, data.size);
            sequence_numbers.insert(data.sequence_number);
        }
        assert_eq!((0..4).map(SequenceNumber::from).collect::<BTreeSet<_>>(), sequence_numbers);
        assert!(replies.halt().is_ok());
        socket.should_send_number_of_messages(4).should_send_to_address(&LOCALHOST);
    }

    #[test]
    fn ping_ipv6_localhost_succeeds() {
        let localhost = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let socket = SocketMock::new(IpFamily::V6, OnSend::ReturnDefault, OnReceive::ReturnEcho);
        let request = PingRequest { count: 2, delay: Duration::ZERO, ..PingRequest::new(localhost) };

        let replies: Vec<PingReply> = send_with_socket(&request, localhost, socket.clone(), &CancelToken::new()).collect();

        assert_eq!(2, replies.len());
        assert!(replies.iter().all(|reply| reply.data().map(|data| data.source) == Some(localhost)));
        socket.should_send_to_address(&localhost);
    }

    #[test]
    fn failed_sends_do_not_stop_the_stream() {
        let socket = SocketMock::new(IpFamily::V4, OnSend::ReturnErr, OnReceive::ReturnWouldBlock)
            .with_inbound(Inbound::Bytes(vec![0xFF]))
            .with_inbound(Inbound::Err(std::io::ErrorKind::Other))
            .with_inbound(Inbound::Bytes(vec![3, 1, 0, 0, 0, 0, 0, 0]));

        let replies: Vec<PingReply> =
            send_with_socket(&request(3, Duration::ZERO), LOCALHOST, socket.clone(), &CancelToken::new()).collect();

        assert_eq!(3, replies.len());
        assert!(matches!(replies[0], PingReply::Error(ReplyError::Decode(_))));
        assert!(matches!(replies[1], PingReply::Error(ReplyError::Receive(_))));
        assert!(matches!(replies[2], PingReply::Error(ReplyError::UnknownReply { icmp_type: 3, code: 1 })));
        socket.should_send_number_of_messages(0);
    }

    #[test]
    fn malformed_reply_is_counted() {
        let socket = SocketMock::new_default().with_inbound(Inbound::Bytes(vec![0x00, 0x00]));

        let replies: Vec<PingReply> =
            send_with_socket(&request(2, Duration::ZERO), LOCALHOST, socket, &CancelToken::new()).collect();

        assert_eq!(2, replies.len());
        assert!(matches!(replies[0], PingReply::Error(ReplyError::Decode(_))));
        assert!(replies[1].is_echo());
    }

    #[test]
    fn small_payload_is_raised_to_timestamp_size() {
        let socket = SocketMock::new_default();
        let request = PingRequest { size: 3, ..request(2, Duration::ZERO) };

        let replies: Vec<PingReply> = send_with_socket(&request, LOCALHOST, socket.clone(), &CancelToken::new()).collect();

        assert!(replies.iter().all(PingReply::is_echo));
        assert!(socket.sent().iter().all(|package| package.len() == 8 + 15));
    }

    #[test]
    fn own_probes_are_not_counted() {
        let socket = SocketMock::new(IpFamily::V4, OnSend::ReturnDefault, OnReceive::ReturnLoopback);

        let replies: Vec<PingReply> =
            send_with_socket(&request(3, Duration::ZERO), LOCALHOST, socket.clone(), &CancelToken::new()).collect();

        assert_eq!(3, replies.len());
        assert!(replies.iter().all(PingReply::is_echo));
        socket.should_send_number_of_messages(3);
    }

    #[test]
    fn cancel_ends_the_stream_early() {
        let socket = SocketMock::new(IpFamily::V4, OnSend::ReturnDefault, OnReceive::ReturnWouldBlock);
        let cancel = CancelToken::new();
        let mut replies = send_with_socket(&request(5, Duration::from_secs(3600)), LOCALHOST, socket, &cancel);

        let canceller = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let start = Instant::now();
        assert!(replies.next().is_none());
        assert!(matches!(replies.halt(), Err(PingError::Cancelled)));
        assert_lt!(start.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn completed_receiver_ends_sender_wait() {
        let socket = SocketMock::new_default()
            .with_inbound(Inbound::Bytes(vec![0xFF]))
            .with_inbound(Inbound::Bytes(vec![0xFF]));

        let start = Instant::now();
        let mut replies =
            send_with_socket(&request(3, Duration::from_secs(3600)), LOCALHOST, socket.clone(), &CancelToken::new());
        assert_eq!(3, replies.by_ref().count());
        assert!(replies.halt().is_ok());

        assert_lt!(start.elapsed(), Duration::from_secs(60));
        socket.should_send_number_of_messages(1);
    }

    #[test]
    fn dropping_the_stream_stops_the_workers() {
        let socket = SocketMock::new_default();
        let mut replies = send_with_socket(&request(100, Duration::ZERO), LOCALHOST, socket, &CancelToken::new());

        let start = Instant::now();
        assert!(replies.next().is_some());
        drop(replies);

        assert_lt!(start.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn zero_count_opens_nothing() {
        let request = PingRequest { count: 0, ..PingRequest::new(LOCALHOST) };

        let mut replies = send(&request, &PingConfig::default(), &CancelToken::new()).unwrap();

        assert!(replies.next().is_none());
        assert!(replies.halt().is_ok());
    }

    #[test]
    fn unspecified_target_is_rejected_before_setup() {
        let request = PingRequest::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let send_result = send(&request, &PingConfig::default(), &CancelToken::new());

        assert!(matches!(send_result, Err(PingError::InvalidTarget(_))));
    }

    #[test]
    fn default_config() {
        let config = PingConfig::default();
        assert_eq!(SocketType::Dgram, config.socket_type);
        assert_eq!(Duration::from_millis(100), config.poll_interval);
        assert_eq!(Duration::from_millis(100), config.effective_poll_interval());
    }

    #[test]
    fn tiny_poll_interval_is_raised() {
        for poll_interval in [Duration::ZERO, Duration::from_nanos(500), Duration::from_micros(999)] {
            let config = PingConfig { poll_interval, ..PingConfig::default() };
            assert_eq!(Duration::from_millis(1), config.effective_poll_interval());
        }
        let config = PingConfig { poll_interval: Duration::from_millis(2), ..PingConfig::default() };
        assert_eq!(Duration::from_millis(2), config.effective_poll_interval());
    }
}
