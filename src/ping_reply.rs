use std::net::IpAddr;
use std::time::Duration;

use crate::icmp::{HopCount, SequenceNumber};
use crate::ReplyError;

/// Outcome of one inbound event. Every event the receiver processes yields exactly one reply.
#[derive(Debug)]
pub enum PingReply {
    Echo(PingReplyData),
    Error(ReplyError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PingReplyData {
    pub source: IpAddr,
    pub sequence_number: SequenceNumber,
    pub hop_count: Option<HopCount>,
    pub rtt: Duration,
    /// ICMP message size in bytes
    pub size: usize,
}

impl PingReply {
    pub fn is_echo(&self) -> bool {
        matches!(self, PingReply::Echo(_))
    }

    pub fn data(&self) -> Option<&PingReplyData> {
        match self {
            PingReply::Echo(data) => Some(data),
            PingReply::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ReplyError> {
        match self {
            PingReply::Echo(_) => None,
            PingReply::Error(error) => Some(error),
        }
    }
}

impl From<ReplyError> for PingReply {
    fn from(error: ReplyError) -> Self {
        PingReply::Error(error)
    }
}
