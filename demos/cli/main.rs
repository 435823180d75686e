use std::net::IpAddr;
use std::time::Duration;

use ping_stream::{CancelToken, PingConfig, PingReply, PingRequest, SocketType};

type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(argh::FromArgs)]
/// ping - send ICMP ECHO_REQUEST to an IP address
struct Args {
    #[argh(option, short = 'c', default = "4")]
    /// stop after <count> replies
    count: u16,

    #[argh(option, short = 'i', default = "1.0")]
    /// wait <interval> seconds between sending each request
    interval: f64,

    #[argh(option, short = 's', default = "64")]
    /// number of payload bytes to send
    size: usize,

    #[argh(switch)]
    /// use a raw socket (needs CAP_NET_RAW)
    raw: bool,

    #[argh(positional)]
    /// IPv4 or IPv6 address
    target: String,
}

fn main() -> Result<(), GenericError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args: Args = argh::from_env();
    let target: IpAddr = args.target.parse().map_err(|e| format!("invalid target {:?}: {e}", args.target))?;
    let delay = Duration::try_from_secs_f64(args.interval)?;

    let request = PingRequest { target, size: args.size, count: args.count, delay };
    let config = PingConfig {
        socket_type: if args.raw { SocketType::Raw } else { SocketType::Dgram },
        ..PingConfig::default()
    };

    tracing::info!("PING {target}: {} data bytes", request.effective_size());
    let mut replies = ping_stream::send(&request, &config, &CancelToken::new())?;
    for reply in replies.by_ref() {
        match reply {
            PingReply::Echo(data) => {
                let hop_count = data.hop_count.map_or_else(|| "?".to_owned(), |hop_count| hop_count.to_string());
                tracing::info!(
                    "{} bytes from {}: icmp_seq={} ttl={hop_count} time={:?}",
                    data.size,
                    data.source,
                    data.sequence_number,
                    data.rtt
                );
            }
            PingReply::Error(e) => tracing::warn!("{e}"),
        }
    }
    replies.halt()?;
    Ok(())
}
