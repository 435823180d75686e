#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! ICMP echo ("ping") as a stream of replies.
//!
//! [`send`] starts one exchange with a target: a sender thread emits `count` echo requests and a
//! receiver thread turns every inbound ICMP event into a [`PingReply`], delivered in arrival
//! order through [`PingReplies`].

pub use cancel_token::CancelToken;
pub use icmp::{DecodeError, EncodeError, HopCount, IpFamily, SequenceNumber, TimestampError};
pub use ping_error::{PingError, PingResult, ReplyError};
pub use ping_replies::PingReplies;
pub use ping_reply::{PingReply, PingReplyData};
pub use ping_request::{PingRequest, MIN_PAYLOAD_SIZE};
pub use ping_runner::{send, PingConfig, SocketType};

mod cancel_token;
mod icmp;
mod ping_error;
mod ping_receiver;
mod ping_replies;
mod ping_reply;
mod ping_request;
mod ping_runner;
mod ping_sender;
