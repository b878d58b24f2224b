//! Sends a fixed TTML document to a UDP endpoint, fragmenting it per
//! `--max-fragment-size` if needed, and logs each packet it emits.
//!
//! ```bash
//! tx_demo --addr 127.0.0.1 --port 5004 --max-fragment-size 64
//! ```

use std::time::SystemTime;

use rtp_ttml::transmitter::{Transmitter, TransmitterConfig};

struct Args {
    addr: String,
    port: u16,
    max_fragment_size: usize,
}

fn parse_args() -> Args {
    let mut addr = "127.0.0.1".to_string();
    let mut port: u16 = 5004;
    let mut max_fragment_size = 1200usize;

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--addr" => addr = args.next().expect("--addr needs a value"),
            "--port" => port = args.next().expect("--port needs a value").parse().expect("invalid port"),
            "--max-fragment-size" => {
                max_fragment_size = args
                    .next()
                    .expect("--max-fragment-size needs a value")
                    .parse()
                    .expect("invalid size");
            }
            other => panic!("unrecognized argument: {other}"),
        }
    }

    Args {
        addr,
        port,
        max_fragment_size,
    }
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
    tracing::info!(
        addr = %args.addr,
        port = args.port,
        max_fragment_size = args.max_fragment_size,
        "tx_demo starting"
    );

    let mut config = TransmitterConfig::default();
    config.max_fragment_size = args.max_fragment_size;

    let mut tx = Transmitter::new(args.addr.clone(), args.port, config)?;
    let mut conn = tx.connect()?;

    let doc = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p>Hello from tx_demo</p></div></body></tt>"#;
    conn.send_doc(doc, SystemTime::now())?;

    tracing::info!(next_seq_num = conn.next_seq_num(), "document sent");
    Ok(())
}
