//! Send timestamp carried in the first bytes of every echo payload.
//!
//! Layout (version 1, 15 bytes, big endian):
//! `[version: u8][seconds since 0001-01-01T00:00:00Z: i64][nanoseconds: u32][zone offset in minutes: i16]`.
//! The zone offset is always written as -1 (UTC) and ignored on decode.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) const TIMESTAMP_LEN: usize = 15;

const VERSION: u8 = 1;
const UTC_OFFSET: i16 = -1;
// Seconds between 0001-01-01 and 1970-01-01.
const UNIX_TO_INTERNAL: i64 = 62_135_596_800;
const NANOS_PER_SEC: u32 = 1_000_000_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp needs {TIMESTAMP_LEN} bytes, got {0}")]
    Truncated(usize),
    #[error("unsupported timestamp version {0}")]
    UnsupportedVersion(u8),
    #[error("nanoseconds out of range: {0}")]
    InvalidNanos(u32),
    #[error("timestamp not representable")]
    OutOfRange,
}

#[allow(clippy::cast_possible_wrap)]
pub(crate) fn encode(time: SystemTime) -> [u8; TIMESTAMP_LEN] {
    let (seconds, nanos) = match time.duration_since(UNIX_EPOCH) {
        Ok(since) => (since.as_secs() as i64, since.subsec_nanos()),
        Err(before) => {
            let before = before.duration();
            let mut seconds = -(before.as_secs() as i64);
            let mut nanos = before.subsec_nanos();
            if nanos > 0 {
                seconds -= 1;
                nanos = NANOS_PER_SEC - nanos;
            }
            (seconds, nanos)
        }
    };

    let mut bytes = [0u8; TIMESTAMP_LEN];
    bytes[0] = VERSION;
    bytes[1..9].copy_from_slice(&(seconds + UNIX_TO_INTERNAL).to_be_bytes());
    bytes[9..13].copy_from_slice(&nanos.to_be_bytes());
    bytes[13..15].copy_from_slice(&UTC_OFFSET.to_be_bytes());
    bytes
}

#[allow(clippy::cast_sign_loss)]
pub(crate) fn decode(bytes: &[u8]) -> Result<SystemTime, TimestampError> {
    if bytes.len() < TIMESTAMP_LEN {
        return Err(TimestampError::Truncated(bytes.len()));
    }
    if bytes[0] != VERSION {
        return Err(TimestampError::UnsupportedVersion(bytes[0]));
    }
    let mut seconds = [0u8; 8];
    seconds.copy_from_slice(&bytes[1..9]);
    let mut nanos = [0u8; 4];
    nanos.copy_from_slice(&bytes[9..13]);

    let nanos = u32::from_be_bytes(nanos);
    if nanos >= NANOS_PER_SEC {
        return Err(TimestampError::InvalidNanos(nanos));
    }
    let unix_seconds = i64::from_be_bytes(seconds)
        .checked_sub(UNIX_TO_INTERNAL)
        .ok_or(TimestampError::OutOfRange)?;

    let time = if unix_seconds >= 0 {
        UNIX_EPOCH.checked_add(Duration::new(unix_seconds as u64, nanos))
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(unix_seconds.unsigned_abs()))
            .and_then(|t| t.checked_add(Duration::from_nanos(u64::from(nanos))))
    };
    time.ok_or(TimestampError::OutOfRange)
}

/// Time elapsed since `sent`, zero if the wall clock stepped backwards in between.
pub(crate) fn elapsed_since(sent: SystemTime) -> Duration {
    SystemTime::now().duration_since(sent).unwrap_or(Duration::ZERO)
}
