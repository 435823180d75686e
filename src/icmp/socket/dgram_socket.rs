use super::control_message::{recv_msg, ReceivedMessage};
use super::{Datagram, TSocket};
use crate::icmp::IpFamily;
use crate::PingError;
use socket2::Type;
use std::{io, time::Duration};

/// Unprivileged ICMP socket (`SOCK_DGRAM`). The kernel strips the IP header, fills in the
/// checksum and only delivers replies to probes sent through this socket.
pub(crate) struct DgramSocket {
    socket: socket2::Socket,
    family: IpFamily,
}

impl DgramSocket {
    pub(crate) fn new(family: IpFamily, poll_interval: Duration) -> Result<Self, PingError> {
        tracing::trace!("creating {family} DgramSocket");
        let socket = super::open(Type::DGRAM, family, poll_interval)?;
        Ok(DgramSocket { socket, family })
    }
}

impl TSocket for DgramSocket {
    fn family(&self) -> IpFamily {
        self.family
    }

    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<Datagram> {
        let ReceivedMessage { size, source, hop_count } = recv_msg(&self.socket, self.family, buf)?;
        if size == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "socket closed"));
        }
        Ok(Datagram { size, source, hop_count })
    }
}
