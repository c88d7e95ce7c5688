//! Remote device example.
//!
//! Clicks a point on the remote screen and types text into it through the
//! device action space.
//!
//! Usage:
//!   cargo run --example type_text -- <host> <x> <y> <text>
//!
//! Set `VNC_PASSWORD` for VNC authentication, or `VNC_USERNAME` as well
//! for Apple Remote Desktop and NTLM servers.

use rustvncclient::{ConnectionOptions, DeviceOptions, RemoteDevice};
use serde_json::json;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [host, x, y, text] = args.as_slice() else {
        eprintln!("usage: type_text <host> <x> <y> <text>");
        std::process::exit(2);
    };
    let (x, y): (f64, f64) = (x.parse()?, y.parse()?);

    let mut options = ConnectionOptions::new(host.as_str());
    match (std::env::var("VNC_USERNAME"), std::env::var("VNC_PASSWORD")) {
        (Ok(user), Ok(password)) => options = options.with_credentials(user, password),
        (Err(_), Ok(password)) => options = options.with_password(password),
        _ => {}
    }

    let mut device = RemoteDevice::new(DeviceOptions::new(options));
    device.connect().await?;
    println!("{}", device.describe());

    device
        .call_action(
            "Input",
            json!({ "value": text, "mode": "replace", "locate": { "center": [x, y] } }),
        )
        .await?;
    device.call_action("KeyboardPress", json!({ "keyName": "Enter" })).await?;

    device.destroy().await;
    Ok(())
}
