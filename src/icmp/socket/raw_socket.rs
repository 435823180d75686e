use super::control_message::{recv_msg, ReceivedMessage};
use super::{Datagram, TSocket};
use crate::icmp::{HopCount, IpFamily};
use crate::PingError;
use pnet_packet::ipv4::Ipv4Packet;
use socket2::Type;
use std::{io, time::Duration};

/// Raw ICMP socket (`SOCK_RAW`, needs CAP_NET_RAW). Sees every ICMP message arriving at the
/// host; on IPv4 the IP header is delivered in front of the ICMP message.
pub(crate) struct RawSocket {
    socket: socket2::Socket,
    family: IpFamily,
}

impl RawSocket {
    pub(crate) fn new(family: IpFamily, poll_interval: Duration) -> Result<Self, PingError> {
        tracing::trace!("creating {family} RawSocket");
        let socket = super::open(Type::RAW, family, poll_interval)?;
        Ok(RawSocket { socket, family })
    }

    /// `buf` must leave room for the IPv4 header, which is stripped in place.
    fn recv_from_v4(&self, buf: &mut [u8]) -> io::Result<Datagram> {
        let ReceivedMessage { size, source, hop_count } = recv_msg(&self.socket, self.family, buf)?;
        let (size, header_ttl) = strip_ipv4_header(buf, size)?;
        Ok(Datagram { size, source, hop_count: hop_count.or(Some(header_ttl)) })
    }
}

/// Moves the ICMP message in front of `buf`. Returns its size and the TTL from the IPv4 header.
fn strip_ipv4_header(buf: &mut [u8], size: usize) -> io::Result<(usize, HopCount)> {
    let ipv4_packet = Ipv4Packet::new(&buf[..size])
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "datagram shorter than an IPv4 header"))?;
    let header_len = usize::from(ipv4_packet.get_header_length()) * 4;
    let ttl = HopCount(ipv4_packet.get_ttl());
    if header_len > size {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid IPv4 header length"));
    }

    buf.copy_within(header_len..size, 0);
    Ok((size - header_len, ttl))
}

impl TSocket for RawSocket {
    fn family(&self) -> IpFamily {
        self.family
    }

    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<Datagram> {
        match self.family {
            IpFamily::V4 => self.recv_from_v4(buf),
            IpFamily::V6 => {
                let ReceivedMessage { size, source, hop_count } = recv_msg(&self.socket, self.family, buf)?;
                Ok(Datagram { size, source, hop_count })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_packet::ipv4::MutableIpv4Packet;

    fn ipv4_datagram(header_words: u8, ttl: u8, icmp: &[u8]) -> Vec<u8> {
        let header_len = usize::from(header_words) * 4;
        let mut buf = vec![0u8; header_len + icmp.len()];
        let mut packet = MutableIpv4Packet::new(&mut buf).unwrap();
        packet.set_version(4);
        packet.set_header_length(header_words);
        packet.set_ttl(ttl);
        buf[header_len..].copy_from_slice(icmp);
        buf
    }

    #[test]
    fn header_is_stripped_in_place() {
        let icmp = [0u8, 0, 0xAB, 0xCD, 0, 1, 0, 2];
        let mut buf = ipv4_datagram(5, 57, &icmp);
        let size = buf.len();
        buf.resize(size + 32, 0xFF);

        let (icmp_size, ttl) = strip_ipv4_header(&mut buf, size).unwrap();

        assert_eq!(icmp.len(), icmp_size);
        assert_eq!(HopCount(57), ttl);
        assert_eq!(icmp, buf[..icmp_size]);
    }

    #[test]
    fn header_with_options_is_stripped() {
        let icmp = [8u8, 0, 0, 0, 0, 7, 0, 0];
        let mut buf = ipv4_datagram(6, 64, &icmp);
        let size = buf.len();

        let (icmp_size, _) = strip_ipv4_header(&mut buf, size).unwrap();

        assert_eq!(icmp, buf[..icmp_size]);
    }

    #[test]
    fn short_datagram_is_rejected() {
        let mut buf = [0x45u8; 12];
        assert!(strip_ipv4_header(&mut buf, 12).is_err());
    }

    #[test]
    fn header_length_beyond_datagram_is_rejected() {
        let mut buf = ipv4_datagram(5, 64, &[]);
        MutableIpv4Packet::new(&mut buf).unwrap().set_header_length(15);
        assert!(strip_ipv4_header(&mut buf, 20).is_err());
    }
}
