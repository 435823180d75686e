use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use more_asserts as ma;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ping_stream::{CancelToken, PingConfig, PingError, PingReply, PingRequest, SocketType};

/*
* Note: Raw sockets work only with root privileges (CAP_NET_RAW). The test is skipped otherwise.
*/
#[test]
fn test_ping_to_localhost_with_raw_socket() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let config = PingConfig { socket_type: SocketType::Raw, ..PingConfig::default() };
    let request = PingRequest { count: 2, delay: Duration::from_millis(50), ..PingRequest::new(localhost) };

    let mut replies = match ping_stream::send(&request, &config, &CancelToken::new()) {
        Ok(replies) => replies,
        Err(e @ (PingError::TransportUnavailable { .. } | PingError::MetadataUnavailable { .. })) => {
            eprintln!("skipping: {e}");
            return;
        }
        Err(e) => panic!("ping setup failed: {e}"),
    };

    // Our own echo requests are looped back to the raw socket too; only the replies count.
    let replies_vec: Vec<PingReply> = replies.by_ref().collect();
    assert_eq!(2, replies_vec.len());
    for reply in &replies_vec {
        let data = reply.data().expect("localhost did not answer with an echo reply");
        assert_eq!(localhost, data.source);
        ma::assert_gt!(data.hop_count.map_or(0, u8::from), 0);
        assert_eq!(8 + 64, data.size);
    }
    assert!(replies.halt().is_ok());
}
