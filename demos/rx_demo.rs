//! Binds a UDP port and logs every reassembled TTML document it receives.
//!
//! ```bash
//! rx_demo --port 5004
//! ```

use rtp_ttml::receiver::{Receiver, ReceiverConfig};

struct Args {
    port: u16,
}

fn parse_args() -> Args {
    let mut port: u16 = 5004;
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--port" => port = args.next().expect("--port needs a value").parse().expect("invalid port"),
            other => panic!("unrecognized argument: {other}"),
        }
    }
    Args { port }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let args = parse_args();
    tracing::info!(port = args.port, "rx_demo starting");

    let mut rx = Receiver::bind(args.port, ReceiverConfig::default())?;
    tracing::info!(addr = ?rx.local_addr()?, "listening");

    rx.run(|doc, timestamp| {
        tracing::info!(timestamp, bytes = doc.len(), "document delivered");
        println!("[ts={timestamp}] {doc}");
    })
}
