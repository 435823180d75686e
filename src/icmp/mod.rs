mod hop_count;
mod ip_family;
pub(crate) mod message;
mod sequence_number;
pub(crate) mod socket;
pub(crate) mod timestamp;

pub use hop_count::HopCount;
pub use ip_family::IpFamily;
pub use message::{DecodeError, EncodeError};
pub use sequence_number::SequenceNumber;
pub use timestamp::TimestampError;

pub(crate) use ip_family::canonical;
pub(crate) use socket::dgram_socket::DgramSocket;
pub(crate) use socket::raw_socket::RawSocket;
pub(crate) use socket::{Datagram, Socket, TSocket};
