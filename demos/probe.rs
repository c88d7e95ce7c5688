//! Probe example.
//!
//! Checks whether a VNC server answers on a host and port, without
//! authenticating.
//!
//! Usage:
//!   cargo run --example probe -- <host> [port]

use rustvncclient::probe;
use std::error::Error;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(5900);

    let result = probe(&host, port, Duration::from_secs(3)).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
