//! Screenshot example.
//!
//! Connects to a VNC server, saves one screenshot as PNG and disconnects.
//!
//! Usage:
//!   cargo run --example screenshot -- <host> [port] [password]
//!
//! The image is written to `screenshot.png`.

use rustvncclient::{ConnectionOptions, Transport};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(5900);

    let mut options = ConnectionOptions::new(host).with_port(port);
    if let Some(password) = args.next() {
        options = options.with_password(password);
    }

    let transport = Transport::new(options);
    transport.connect().await?;
    println!(
        "Connected to {:?} ({}x{})",
        transport.server_name().unwrap_or_default(),
        transport.screen_size().0,
        transport.screen_size().1
    );

    let image = transport.screenshot().await?;
    std::fs::write("screenshot.png", image.to_png()?)?;
    println!("Saved screenshot.png");

    transport.disconnect().await;
    Ok(())
}
