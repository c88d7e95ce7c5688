// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Connectivity probe: is there an RFB server listening?

use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::protocol::VERSION_LENGTH;

/// Outcome of [`probe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    /// Whether the peer greeted with an RFB version string.
    pub available: bool,
    /// The advertised version, e.g. `"RFB 003.008"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Why the server is considered unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            version: None,
            error: Some(error.into()),
        }
    }
}

/// Connects to `host:port` and checks the greeting for an `RFB` prefix.
///
/// Nothing is sent to the server. Never fails: problems are reported in the
/// result.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> ProbeResult {
    let address = format!("{host}:{port}");
    log::debug!("Probing {address}");

    let greeting = tokio::time::timeout(timeout, async {
        let mut stream = TcpStream::connect(&address).await?;
        let mut buf = [0u8; VERSION_LENGTH];
        let read = stream.read(&mut buf).await?;
        Ok::<_, std::io::Error>(buf[..read].to_vec())
    })
    .await;

    match greeting {
        Err(_) => ProbeResult::unavailable(format!(
            "Connection timeout after {}ms",
            timeout.as_millis()
        )),
        Ok(Err(e)) => ProbeResult::unavailable(e.to_string()),
        Ok(Ok(bytes)) => classify_greeting(&bytes),
    }
}

fn classify_greeting(bytes: &[u8]) -> ProbeResult {
    if bytes.starts_with(b"RFB") {
        ProbeResult {
            available: true,
            version: Some(String::from_utf8_lossy(bytes).trim().to_string()),
            error: None,
        }
    } else if bytes.is_empty() {
        ProbeResult::unavailable("Connection closed without a greeting")
    } else {
        ProbeResult::unavailable("Not a VNC server")
    }
}
