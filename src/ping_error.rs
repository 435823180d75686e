use std::io;
use std::net::IpAddr;

use crate::icmp::{DecodeError, EncodeError, IpFamily, TimestampError};

pub type PingResult<T> = std::result::Result<T, PingError>;

/// Errors that end a ping exchange as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PingError {
    #[error("invalid target address {0}")]
    InvalidTarget(IpAddr),
    #[error("could not open {family} socket: {source}")]
    TransportUnavailable {
        family: IpFamily,
        #[source]
        source: io::Error,
    },
    #[error("could not enable {family} hop count reception: {source}")]
    MetadataUnavailable {
        family: IpFamily,
        #[source]
        source: io::Error,
    },
    #[error("ping cancelled")]
    Cancelled,
    #[error("ping worker thread panicked")]
    WorkerPanicked,
}

/// Why an inbound event did not produce round-trip data. Carried inside the reply stream.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("receive failed: {0}")]
    Receive(#[from] io::Error),
    #[error("corrupted or unknown message: {0}")]
    Decode(#[from] DecodeError),
    #[error("unknown reply (type {icmp_type}, code {code})")]
    UnknownReply { icmp_type: u8, code: u8 },
    #[error("corrupted reply: {0}")]
    CorruptedReply(#[source] TimestampError),
}

/// Failure to put one probe on the wire. Logged by the sender, never surfaced on the stream.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ProbeError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("write error: {0}")]
    Send(#[from] io::Error),
    #[error("incomplete write: {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },
}
