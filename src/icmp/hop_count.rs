type HopCountInnerType = u8;

/// Remaining forwarding hops of a received datagram: the IPv4 TTL or the IPv6 hop limit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HopCount(pub HopCountInnerType);

impl From<HopCountInnerType> for HopCount {
    fn from(integer: HopCountInnerType) -> Self {
        HopCount(integer)
    }
}

impl From<HopCount> for HopCountInnerType {
    fn from(hop_count: HopCount) -> Self {
        hop_count.0
    }
}

impl TryFrom<libc::c_int> for HopCount {
    type Error = std::num::TryFromIntError;

    fn try_from(value: libc::c_int) -> Result<Self, Self::Error> {
        HopCountInnerType::try_from(value).map(HopCount)
    }
}

impl std::fmt::Display for HopCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt() {
        assert_eq!("8", format!("{}", HopCount(8)));
    }

    #[test]
    fn try_from_c_int() {
        assert_eq!(HopCount(64), HopCount::try_from(64 as libc::c_int).unwrap());
        assert!(HopCount::try_from(-1 as libc::c_int).is_err());
        assert!(HopCount::try_from(256 as libc::c_int).is_err());
    }
}
