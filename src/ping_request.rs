use std::net::IpAddr;
use std::time::Duration;

use crate::icmp::{canonical, timestamp};
use crate::{PingError, PingResult};

/// Smallest echo payload: enough room for the embedded send timestamp.
pub const MIN_PAYLOAD_SIZE: usize = timestamp::TIMESTAMP_LEN;

/// One ping exchange: `count` echo requests of `size` payload bytes to `target`, `delay` apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingRequest {
    pub target: IpAddr,
    pub size: usize,
    pub count: u16,
    pub delay: Duration,
}

impl PingRequest {
    pub fn new(target: IpAddr) -> Self {
        PingRequest { target, size: 64, count: 4, delay: Duration::from_secs(1) }
    }

    /// Payload size actually sent, raised to [`MIN_PAYLOAD_SIZE`] if needed.
    pub fn effective_size(&self) -> usize {
        self.size.max(MIN_PAYLOAD_SIZE)
    }

    /// Target in the family it is probed over, with IPv4-mapped IPv6 addresses unwrapped.
    pub(crate) fn resolved_target(&self) -> PingResult<IpAddr> {
        let target = canonical(self.target);
        if target.is_unspecified() {
            return Err(PingError::InvalidTarget(self.target));
        }
        Ok(target)
    }
}
