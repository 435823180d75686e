use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol};

/// Address family of one ping exchange. Selected once from the target address; everything
/// family specific (socket domain, protocol, message types, control messages) hangs off it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// IPv4 and IPv4-mapped IPv6 targets use ICMP, all other IPv6 targets use ICMPv6.
    pub fn of(addr: IpAddr) -> IpFamily {
        match canonical(addr) {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    pub fn protocol_number(self) -> u8 {
        match self {
            IpFamily::V4 => 1,
            IpFamily::V6 => 58,
        }
    }

    pub(crate) fn echo_request_type(self) -> u8 {
        match self {
            IpFamily::V4 => 8,
            IpFamily::V6 => 128,
        }
    }

    pub(crate) fn echo_reply_type(self) -> u8 {
        match self {
            IpFamily::V4 => 0,
            IpFamily::V6 => 129,
        }
    }

    /// Largest echo payload that still fits in one IP datagram.
    pub(crate) fn max_payload_size(self) -> usize {
        match self {
            // 65535 - 20 (IPv4 header) - 8 (ICMP echo header)
            IpFamily::V4 => 65_507,
            // 65535 - 8 (ICMPv6 echo header); the IPv6 header is not part of the payload length
            IpFamily::V6 => 65_527,
        }
    }

    pub(crate) fn domain(self) -> Domain {
        match self {
            IpFamily::V4 => Domain::IPV4,
            IpFamily::V6 => Domain::IPV6,
        }
    }

    pub(crate) fn protocol(self) -> Protocol {
        match self {
            IpFamily::V4 => Protocol::ICMPV4,
            IpFamily::V6 => Protocol::ICMPV6,
        }
    }

    pub(crate) fn wildcard(self) -> SocketAddr {
        match self {
            IpFamily::V4 => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpFamily::V6 => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ICMPv4"),
            IpFamily::V6 => write!(f, "ICMPv6"),
        }
    }
}

/// Unwraps IPv4-mapped IPv6 addresses so they are probed over ICMPv4.
pub(crate) fn canonical(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        IpAddr::V4(_) => addr,
    }
}
