use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::os::unix::io::AsRawFd;
use std::{io, ptr, slice};

use libc::c_int;

use crate::icmp::{HopCount, IpFamily};

// Room for a handful of control messages. u64 elements keep the buffer aligned for cmsghdr.
const CONTROL_BUFFER_WORDS: usize = 16;
const INT_LEN: usize = mem::size_of::<c_int>();

impl IpFamily {
    /// Asks the kernel to attach the hop count of every received datagram as a control message.
    pub(crate) fn enable_metadata(self, socket: &socket2::Socket) -> io::Result<()> {
        match self {
            IpFamily::V4 => set_flag(socket, libc::IPPROTO_IP, libc::IP_RECVTTL),
            IpFamily::V6 => set_flag(socket, libc::IPPROTO_IPV6, libc::IPV6_RECVHOPLIMIT),
        }
    }

    /// Extracts the hop count from one control message, `None` if the message carries something else.
    pub(crate) fn parse_metadata(self, level: c_int, kind: c_int, data: &[u8]) -> Option<HopCount> {
        let matches = match self {
            // Linux reports IP_TTL with an int, the BSDs report IP_RECVTTL with a single byte.
            IpFamily::V4 => level == libc::IPPROTO_IP && (kind == libc::IP_TTL || kind == libc::IP_RECVTTL),
            IpFamily::V6 => level == libc::IPPROTO_IPV6 && kind == libc::IPV6_HOPLIMIT,
        };
        if !matches {
            return None;
        }
        match data.len() {
            1 => Some(HopCount(data[0])),
            len if len >= INT_LEN => {
                let mut value = [0u8; INT_LEN];
                value.copy_from_slice(&data[..INT_LEN]);
                HopCount::try_from(c_int::from_ne_bytes(value)).ok()
            }
            _ => None,
        }
    }
}

fn set_flag(socket: &socket2::Socket, level: c_int, name: c_int) -> io::Result<()> {
    let enabled: c_int = 1;
    #[allow(clippy::cast_possible_truncation)]
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            ptr::addr_of!(enabled).cast(),
            mem::size_of::<c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Bytes, sender and hop count of one datagram as returned by `recvmsg`.
pub(crate) struct ReceivedMessage {
    pub size: usize,
    pub source: IpAddr,
    pub hop_count: Option<HopCount>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn recv_msg(socket: &socket2::Socket, family: IpFamily, buf: &mut [u8]) -> io::Result<ReceivedMessage> {
    let capacity = buf.len();
    let mut addr: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut iov = libc::iovec { iov_base: buf.as_mut_ptr().cast(), iov_len: buf.len() };
    let mut control = [0u64; CONTROL_BUFFER_WORDS];

    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_name = ptr::addr_of_mut!(addr).cast();
    msg.msg_namelen = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    msg.msg_iov = ptr::addr_of_mut!(iov);
    msg.msg_iovlen = 1;
    msg.msg_control = control.as_mut_ptr().cast();
    msg.msg_controllen = mem::size_of_val(&control) as _;

    let n_bytes_received = unsafe { libc::recvmsg(socket.as_raw_fd(), &mut msg, 0) };
    if n_bytes_received < 0 {
        return Err(io::Error::last_os_error());
    }
    if msg.msg_flags & libc::MSG_TRUNC != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("datagram larger than the {capacity} byte receive buffer"),
        ));
    }

    let mut hop_count = None;
    let header_len = unsafe { libc::CMSG_LEN(0) } as usize;
    let mut cmsg = unsafe { libc::CMSG_FIRSTHDR(&msg) };
    while !cmsg.is_null() {
        // The kernel wrote the control messages into `control`, which outlives this loop.
        let (level, kind, data) = unsafe {
            let header = &*cmsg;
            let data_len = (header.cmsg_len as usize).saturating_sub(header_len);
            (header.cmsg_level, header.cmsg_type, slice::from_raw_parts(libc::CMSG_DATA(cmsg), data_len))
        };
        if let Some(parsed) = family.parse_metadata(level, kind, data) {
            hop_count = Some(parsed);
        }
        cmsg = unsafe { libc::CMSG_NXTHDR(&msg, cmsg) };
    }

    Ok(ReceivedMessage { size: n_bytes_received as usize, source: source_address(&addr)?, hop_count })
}

fn source_address(addr: &libc::sockaddr_storage) -> io::Result<IpAddr> {
    match c_int::from(addr.ss_family) {
        libc::AF_INET => {
            let sin = unsafe { &*ptr::addr_of!(*addr).cast::<libc::sockaddr_in>() };
            Ok(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
        }
        libc::AF_INET6 => {
            let sin6 = unsafe { &*ptr::addr_of!(*addr).cast::<libc::sockaddr_in6>() };
            Ok(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected source address family {other}"),
        )),
    }
}
