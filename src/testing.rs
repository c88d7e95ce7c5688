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

//! A scripted RFB server for tests.
//!
//! Speaks RFB 3.8 (or whatever version it is told to announce), offers None
//! or VNC authentication, answers framebuffer update requests with a solid
//! Raw rectangle, and forwards every client message to the test.

use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::auth::vnc::encrypt_challenge;
use crate::protocol::{
    ClientMessage, PixelFormat, Rectangle, ServerInit, ENCODING_DESKTOP_SIZE, ENCODING_RAW,
    SERVER_MSG_BELL, SERVER_MSG_FRAMEBUFFER_UPDATE, SERVER_MSG_SERVER_CUT_TEXT,
};
use crate::translate::pack_pixel;

#[derive(Debug, Clone)]
pub(crate) struct FakeServerConfig {
    pub width: u16,
    pub height: u16,
    pub colour: [u8; 3],
    pub version: [u8; 12],
    /// Require VNC authentication with this password.
    pub password: Option<String>,
    /// How many update requests get an answer.
    pub answered_requests: usize,
    /// Announce a new desktop size in the second update.
    pub resize_to: Option<(u16, u16)>,
    /// Ring the bell and send "café" before the second update.
    pub send_bell_and_cut_text: bool,
    /// Once the answered requests run out, send the start of one more
    /// update and then go quiet.
    pub stall_midway: bool,
}

impl Default for FakeServerConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 12,
            colour: [0, 0, 0],
            version: *b"RFB 003.008\n",
            password: None,
            answered_requests: usize::MAX,
            resize_to: None,
            send_bell_and_cut_text: false,
            stall_midway: false,
        }
    }
}

/// One-connection loopback server.
pub(crate) struct FakeServer {
    port: u16,
    messages: mpsc::UnboundedReceiver<ClientMessage>,
}

impl FakeServer {
    pub async fn start(config: FakeServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, messages) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                serve(socket, config, tx).await;
            }
        });
        Self { port, messages }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Next message the client sent, waiting up to a second.
    pub async fn next_message(&mut self) -> Option<ClientMessage> {
        tokio::time::timeout(Duration::from_secs(1), self.messages.recv())
            .await
            .ok()
            .flatten()
    }

    /// Discards messages received so far.
    pub async fn drain(&mut self) {
        while self.messages.try_recv().is_ok() {}
    }

    /// Collects messages until the client goes quiet for `idle`.
    pub async fn collect(&mut self, idle: Duration) -> Vec<ClientMessage> {
        let mut out = Vec::new();
        while let Ok(Some(message)) = tokio::time::timeout(idle, self.messages.recv()).await {
            out.push(message);
        }
        out
    }
}

/// Serves one client on `stream` until it disconnects.
pub(crate) async fn serve<S>(
    mut stream: S,
    config: FakeServerConfig,
    messages: mpsc::UnboundedSender<ClientMessage>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if handshake(&mut stream, &config).await.is_err() {
        return;
    }

    let format = PixelFormat::rgb888();
    let (mut width, mut height) = (config.width, config.height);
    let mut answered = 0usize;
    let mut stalled = false;

    while let Ok(message) = ClientMessage::read_from(&mut stream).await {
        let is_request = matches!(message, ClientMessage::FramebufferUpdateRequest { .. });
        let _ = messages.send(message);
        if is_request && answered >= config.answered_requests && config.stall_midway && !stalled {
            stalled = true;
            let mut buf = BytesMut::new();
            buf.put_u8(SERVER_MSG_FRAMEBUFFER_UPDATE);
            buf.put_u8(0);
            buf.put_u16(1);
            Rectangle {
                x: 0,
                y: 0,
                width,
                height,
                encoding: ENCODING_RAW,
            }
            .write_header(&mut buf);
            buf.put_bytes(0xff, 4);
            if stream.write_all(&buf).await.is_err() {
                return;
            }
            continue;
        }
        if !is_request || answered >= config.answered_requests {
            continue;
        }
        answered += 1;

        let mut buf = BytesMut::new();
        if answered == 2 && config.send_bell_and_cut_text {
            buf.put_u8(SERVER_MSG_BELL);
            buf.put_u8(SERVER_MSG_SERVER_CUT_TEXT);
            buf.put_bytes(0, 3);
            buf.put_u32(4);
            buf.put_slice(&[b'c', b'a', b'f', 0xe9]);
        }

        let resize = if answered == 2 { config.resize_to } else { None };
        buf.put_u8(SERVER_MSG_FRAMEBUFFER_UPDATE);
        buf.put_u8(0);
        buf.put_u16(if resize.is_some() { 2 } else { 1 });
        if let Some((w, h)) = resize {
            (width, height) = (w, h);
            Rectangle {
                x: 0,
                y: 0,
                width,
                height,
                encoding: ENCODING_DESKTOP_SIZE,
            }
            .write_header(&mut buf);
        }
        Rectangle {
            x: 0,
            y: 0,
            width,
            height,
            encoding: ENCODING_RAW,
        }
        .write_header(&mut buf);
        let [r, g, b] = config.colour;
        let pixel = pack_pixel(r, g, b, &format);
        for _ in 0..usize::from(width) * usize::from(height) {
            buf.put_slice(&pixel);
        }

        if stream.write_all(&buf).await.is_err() {
            return;
        }
    }
}

async fn handshake<S>(stream: &mut S, config: &FakeServerConfig) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&config.version).await?;
    let mut version = [0u8; 12];
    stream.read_exact(&mut version).await?;

    let mut buf = BytesMut::new();
    match &config.password {
        None => {
            stream.write_all(&[1, 1]).await?;
            let _chosen = stream.read_u8().await?;
            stream.write_u32(0).await?;
        }
        Some(password) => {
            stream.write_all(&[1, 2]).await?;
            let _chosen = stream.read_u8().await?;
            let challenge: [u8; 16] = core::array::from_fn(|i| (i * 7 + 3) as u8);
            stream.write_all(&challenge).await?;
            let mut response = [0u8; 16];
            stream.read_exact(&mut response).await?;

            let expected = encrypt_challenge(&challenge, password).unwrap();
            if response != expected {
                let reason = b"Authentication failed";
                buf.put_u32(1);
                buf.put_u32(reason.len() as u32);
                buf.put_slice(reason);
                stream.write_all(&buf).await?;
                return Err(std::io::ErrorKind::PermissionDenied.into());
            }
            stream.write_u32(0).await?;
        }
    }

    let _shared = stream.read_u8().await?;
    ServerInit {
        framebuffer_width: config.width,
        framebuffer_height: config.height,
        pixel_format: PixelFormat::rgb888(),
        name: "fake".to_string(),
    }
    .write_to(&mut buf);
    stream.write_all(&buf).await?;
    stream.flush().await
}
