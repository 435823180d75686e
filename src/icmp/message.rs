use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet_packet::icmp::{IcmpCode, IcmpPacket, IcmpType};
use pnet_packet::icmpv6::{Icmpv6Code, Icmpv6Packet, Icmpv6Type, MutableIcmpv6Packet};
use pnet_packet::Packet;

use crate::icmp::{IpFamily, SequenceNumber};

/// type, code and checksum
pub(crate) const ICMP_HEADER_LEN: usize = 4;
/// ICMP header plus identifier and sequence number
pub(crate) const ECHO_HEADER_LEN: usize = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("payload of {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("could not frame echo request")]
    Framing,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated ICMP message: {len} bytes, at least {needed} needed")]
    Truncated { len: usize, needed: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct IcmpMessage {
    pub icmp_type: u8,
    pub code: u8,
    pub body: MessageBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MessageBody {
    Echo(EchoBody),
    Other(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EchoBody {
    pub identifier: u16,
    pub sequence_number: SequenceNumber,
    pub data: Vec<u8>,
}

impl IcmpMessage {
    pub(crate) fn is_echo_reply(&self, family: IpFamily) -> bool {
        self.icmp_type == family.echo_reply_type()
    }

    pub(crate) fn is_echo_request(&self, family: IpFamily) -> bool {
        self.icmp_type == family.echo_request_type()
    }
}

pub(crate) fn encode_echo_request(
    family: IpFamily,
    identifier: u16,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let max = family.max_payload_size();
    if payload.len() > max {
        return Err(EncodeError::PayloadTooLarge { size: payload.len(), max });
    }
    match family {
        IpFamily::V4 => encode_v4(identifier, sequence_number, payload),
        IpFamily::V6 => encode_v6(identifier, sequence_number, payload),
    }
}

fn encode_v4(identifier: u16, sequence_number: SequenceNumber, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let buf = vec![0u8; EchoRequestPacket::minimum_packet_size() + payload.len()];
    let mut package = MutableEchoRequestPacket::owned(buf).ok_or(EncodeError::Framing)?;
    package.set_icmp_type(IcmpType::new(IpFamily::V4.echo_request_type()));
    package.set_icmp_code(IcmpCode::new(0));
    package.set_identifier(identifier);
    package.set_sequence_number(sequence_number.into());
    package.set_payload(payload);

    package.set_checksum(0_u16);
    let checksum = pnet_packet::icmp::checksum(&IcmpPacket::new(package.packet()).ok_or(EncodeError::Framing)?);
    package.set_checksum(checksum);
    Ok(package.packet().to_vec())
}

// The checksum stays zero: ICMPv6 sockets compute it over the pseudo header, which is only
// known to the kernel once the source address is chosen.
fn encode_v6(identifier: u16, sequence_number: SequenceNumber, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut body = Vec::with_capacity(ECHO_HEADER_LEN - ICMP_HEADER_LEN + payload.len());
    body.extend_from_slice(&identifier.to_be_bytes());
    body.extend_from_slice(&u16::from(sequence_number).to_be_bytes());
    body.extend_from_slice(payload);

    let mut buf = vec![0u8; ICMP_HEADER_LEN + body.len()];
    let mut package = MutableIcmpv6Packet::new(&mut buf).ok_or(EncodeError::Framing)?;
    package.set_icmpv6_type(Icmpv6Type::new(IpFamily::V6.echo_request_type()));
    package.set_icmpv6_code(Icmpv6Code::new(0));
    package.set_checksum(0_u16);
    package.set_payload(&body);
    Ok(buf)
}

/// Parses an ICMP message as delivered by an ICMP socket, i.e. without IP header.
pub(crate) fn decode_message(bytes: &[u8], family: IpFamily) -> Result<IcmpMessage, DecodeError> {
    let truncated = |needed| DecodeError::Truncated { len: bytes.len(), needed };

    let (icmp_type, code, rest) = match family {
        IpFamily::V4 => {
            let package = IcmpPacket::new(bytes).ok_or_else(|| truncated(ICMP_HEADER_LEN))?;
            (package.get_icmp_type().0, package.get_icmp_code().0, package.payload().to_vec())
        }
        IpFamily::V6 => {
            let package = Icmpv6Packet::new(bytes).ok_or_else(|| truncated(ICMP_HEADER_LEN))?;
            (package.get_icmpv6_type().0, package.get_icmpv6_code().0, package.payload().to_vec())
        }
    };

    if icmp_type != family.echo_reply_type() && icmp_type != family.echo_request_type() {
        return Ok(IcmpMessage { icmp_type, code, body: MessageBody::Other(rest) });
    }

    let echo = match family {
        IpFamily::V4 => {
            // Echo request and echo reply share one layout.
            let package = EchoReplyPacket::new(bytes).ok_or_else(|| truncated(ECHO_HEADER_LEN))?;
            EchoBody {
                identifier: package.get_identifier(),
                sequence_number: package.get_sequence_number().into(),
                data: package.payload().to_vec(),
            }
        }
        IpFamily::V6 => {
            if rest.len() < ECHO_HEADER_LEN - ICMP_HEADER_LEN {
                return Err(truncated(ECHO_HEADER_LEN));
            }
            EchoBody {
                identifier: u16::from_be_bytes([rest[0], rest[1]]),
                sequence_number: u16::from_be_bytes([rest[2], rest[3]]).into(),
                data: rest[4..].to_vec(),
            }
        }
    };
    Ok(IcmpMessage { icmp_type, code, body: MessageBody::Echo(echo) })
}
