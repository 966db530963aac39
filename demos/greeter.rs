//! Greets every client and logs whatever it sends.
//!
//! ```text
//! RUST_LOG=debug cargo run --example greeter -- --address 127.0.0.1:8080
//! ```

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use uplift_select::{DiscardCodec, Reactor, ReactorConfig};

#[derive(Debug, Parser)]
#[command(about = "Single-threaded greeting server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    address: SocketAddr,

    /// Bound each readiness wait, in milliseconds
    #[arg(long)]
    poll_timeout_ms: Option<u64>,

    /// Capacity of the per-read buffer
    #[arg(long, default_value_t = 20)]
    read_buffer_size: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ReactorConfig::builder()
        .read_buffer_size(args.read_buffer_size)
        .poll_timeout(args.poll_timeout_ms.map(Duration::from_millis))
        .build();

    let mut reactor = Reactor::with_codec(config, DiscardCodec)?;
    reactor.listen(args.address)?;
    reactor.run()?;
    Ok(())
}
