use crate::icmp::{HopCount, IpFamily};
use crate::{PingError, SocketType};
use socket2::Type;
use std::net::IpAddr;
use std::{io, time::Duration};

use super::{DgramSocket, RawSocket};

mod control_message;
pub(crate) mod dgram_socket;
pub(crate) mod raw_socket;

/// Metadata of one received datagram. The ICMP message itself is written to the caller's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Datagram {
    pub size: usize,
    pub source: IpAddr,
    pub hop_count: Option<HopCount>,
}

pub(crate) trait TSocket: Send + Sync {
    fn family(&self) -> IpFamily;
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize>;
    /// Blocks for at most the socket's poll interval; `WouldBlock`/`TimedOut` when nothing arrived.
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<Datagram>;
}

pub(crate) enum Socket {
    Raw(RawSocket),
    Dgram(DgramSocket),
}

impl Socket {
    pub(crate) fn new(socket_type: SocketType, family: IpFamily, poll_interval: Duration) -> Result<Self, PingError> {
        match socket_type {
            SocketType::Dgram => Ok(Socket::Dgram(DgramSocket::new(family, poll_interval)?)),
            SocketType::Raw => Ok(Socket::Raw(RawSocket::new(family, poll_interval)?)),
        }
    }
}

impl TSocket for Socket {
    fn family(&self) -> IpFamily {
        match self {
            Socket::Dgram(socket) => socket.family(),
            Socket::Raw(socket) => socket.family(),
        }
    }

    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        match self {
            Socket::Dgram(socket) => socket.send_to(buf, addr),
            Socket::Raw(socket) => socket.send_to(buf, addr),
        }
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<Datagram> {
        match self {
            Socket::Dgram(socket) => socket.recv_from(buf),
            Socket::Raw(socket) => socket.recv_from(buf),
        }
    }
}

/// Creates an ICMP socket of the given type bound to the family's wildcard address, with hop
/// count reception enabled and a read timeout of `poll_interval`.
pub(crate) fn open(socket_type: Type, family: IpFamily, poll_interval: Duration) -> Result<socket2::Socket, PingError> {
    let unavailable = |source| PingError::TransportUnavailable { family, source };

    let socket = socket2::Socket::new(family.domain(), socket_type, Some(family.protocol())).map_err(unavailable)?;
    socket.set_read_timeout(Some(poll_interval)).map_err(unavailable)?;
    socket.bind(&family.wildcard().into()).map_err(unavailable)?;
    family
        .enable_metadata(&socket)
        .map_err(|source| PingError::MetadataUnavailable { family, source })?;
    Ok(socket)
}
