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

//! VNC client transport.
//!
//! A [`Transport`] owns one connection to an RFB server: it runs the
//! handshake, keeps a local copy of the remote framebuffer up to date from a
//! background reader task, and sends pointer, key and clipboard events.
//!
//! # Connection lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> NegotiatingVersion -> Authenticating
//!              -> AwaitingFirstFrame -> Connected -> Disconnected
//! ```
//!
//! Any step may end in [`ConnectionState::Error`]. A transport does not
//! reconnect on its own. Calling `connect` again closes the previous
//! connection first.

mod handshake;
mod probe;

pub use probe::{probe, ProbeResult};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::auth::SecurityType;
use crate::config::ConnectionOptions;
use crate::encoding::{encoding_name, Decoders};
use crate::error::{Result, VncError};
use crate::events::ClientEvent;
use crate::framebuffer::{Framebuffer, RgbaImage};
use crate::protocol::{
    ClientMessage, PixelFormat, ProtocolVersion, Rectangle, ENCODING_DESKTOP_SIZE,
    SERVER_MSG_BELL, SERVER_MSG_FRAMEBUFFER_UPDATE, SERVER_MSG_SERVER_CUT_TEXT,
    SERVER_MSG_SET_COLOUR_MAP_ENTRIES,
};

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Largest `ServerCutText` payload accepted.
const MAX_CUT_TEXT: usize = 1024 * 1024;

/// Connection state of a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, either not yet started or closed.
    Disconnected,
    /// TCP connection in progress.
    Connecting,
    /// Waiting for or answering the server's version string.
    NegotiatingVersion,
    /// Security handshake in progress.
    Authenticating,
    /// Initialised; waiting for the first framebuffer update.
    AwaitingFirstFrame,
    /// Ready for input and screenshots.
    Connected,
    /// The connection failed. Terminal for this transport.
    Error,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Negotiated session parameters, fixed once connected.
#[derive(Debug, Clone)]
struct SessionInfo {
    version: ProtocolVersion,
    security: SecurityType,
    name: String,
}

/// State shared between the transport and its reader task.
struct Shared {
    framebuffer: RwLock<Framebuffer>,
    /// Current size packed as `width << 16 | height`.
    size: AtomicU32,
    events: broadcast::Sender<ClientEvent>,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    fn set_size(&self, width: u16, height: u16) {
        self.size
            .store((u32::from(width) << 16) | u32::from(height), Ordering::Release);
    }

    fn size(&self) -> (u16, u16) {
        let packed = self.size.load(Ordering::Acquire);
        #[allow(clippy::cast_possible_truncation)] // both halves were u16
        ((packed >> 16) as u16, packed as u16)
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

/// A connection to one VNC server.
///
/// All methods take `&self`; wrap the transport in an [`Arc`] to share it
/// between tasks.
pub struct Transport {
    options: ConnectionOptions,
    shared: Arc<Shared>,
    writer: Mutex<Option<BoxedWriter>>,
    reader_task: StdMutex<Option<JoinHandle<()>>>,
    session: StdMutex<Option<SessionInfo>>,
    /// Serializes screenshots; holds the time of the last request.
    request_lock: Mutex<Option<Instant>>,
}

impl Transport {
    /// Creates a disconnected transport for `options`.
    #[must_use]
    pub fn new(options: ConnectionOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            options,
            shared: Arc::new(Shared {
                framebuffer: RwLock::new(Framebuffer::new(0, 0, PixelFormat::rgb888())),
                size: AtomicU32::new(0),
                events,
                state,
            }),
            writer: Mutex::new(None),
            reader_task: StdMutex::new(None),
            session: StdMutex::new(None),
            request_lock: Mutex::new(None),
        }
    }

    /// Connects over TCP and completes the handshake.
    ///
    /// Resolves once the first framebuffer update has been applied. The
    /// whole sequence must finish within the connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::ConnectTimeout`] on timeout, or the error that
    /// ended the handshake. The transport is left in
    /// [`ConnectionState::Error`].
    pub async fn connect(&self) -> Result<()> {
        self.options.validate()?;
        let address = self.options.address();
        let timeout = self.options.connect_timeout;

        self.close_previous().await;
        self.shared.state.send_replace(ConnectionState::Connecting);
        log::info!("Connecting to VNC server at {address}");

        let attempt = async {
            let stream = TcpStream::connect(&address)
                .await
                .map_err(|e| VncError::Connection(format!("{address}: {e}")))?;
            stream.set_nodelay(true)?;
            self.establish(stream).await
        };
        self.finish_connect(tokio::time::timeout(timeout, attempt).await, timeout)
            .await
    }

    /// Runs the handshake over an already-open stream.
    ///
    /// Useful for tunnels and tests. The connect timeout applies as for
    /// [`Transport::connect`].
    ///
    /// # Errors
    ///
    /// As for [`Transport::connect`].
    pub async fn connect_stream<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let timeout = self.options.connect_timeout;
        self.close_previous().await;
        self.shared.state.send_replace(ConnectionState::Connecting);
        let attempt = self.establish(stream);
        self.finish_connect(tokio::time::timeout(timeout, attempt).await, timeout)
            .await
    }

    /// Stops the reader and writer of an earlier connection so they cannot
    /// touch the shared state of the next one.
    async fn close_previous(&self) {
        let had_reader = self
            .reader_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if had_reader {
            log::info!("Closing previous connection to {}", self.options.address());
        }
        self.teardown().await;
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn finish_connect(
        &self,
        outcome: std::result::Result<Result<()>, tokio::time::error::Elapsed>,
        timeout: Duration,
    ) -> Result<()> {
        let result = outcome.unwrap_or(Err(VncError::ConnectTimeout(timeout)));
        if let Err(e) = &result {
            log::warn!("VNC connection to {} failed: {e}", self.options.address());
            self.teardown().await;
            self.shared.state.send_replace(ConnectionState::Error);
        }
        result
    }

    async fn establish<S>(&self, mut stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let session = handshake::handshake(&mut stream, &self.options, &self.shared.state).await?;
        let width = session.server_init.framebuffer_width;
        let height = session.server_init.framebuffer_height;

        // The reader decodes into its own copy and publishes whole updates
        let working = Framebuffer::new(width, height, session.pixel_format.clone());
        *self.shared.framebuffer.write().await = working.clone();
        self.shared.set_size(width, height);
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(SessionInfo {
            version: session.version,
            security: session.security,
            name: session.server_init.name.clone(),
        });

        let (read_half, write_half): (ReadHalf<S>, WriteHalf<S>) = tokio::io::split(stream);
        *self.writer.lock().await = Some(Box::new(write_half));

        // Subscribe before the reader starts so the first update is not missed
        let mut events = self.shared.events.subscribe();
        self.shared
            .state
            .send_replace(ConnectionState::AwaitingFirstFrame);

        let shared = Arc::clone(&self.shared);
        let version = session.version;
        let handle = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let outcome = read_loop(&mut reader, &shared, working, version).await;
            let reason = match outcome {
                Ok(()) => {
                    log::info!("VNC server closed the connection");
                    shared.state.send_replace(ConnectionState::Disconnected);
                    None
                }
                Err(e) => {
                    log::warn!("VNC connection lost: {e}");
                    shared.state.send_replace(ConnectionState::Error);
                    Some(e.to_string())
                }
            };
            shared.emit(ClientEvent::Disconnected { reason });
        });
        *self.reader_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        loop {
            match events.recv().await {
                Ok(ClientEvent::Connected { .. }) => return Ok(()),
                Ok(ClientEvent::Disconnected { reason }) => {
                    return Err(VncError::Connection(
                        reason.unwrap_or_else(|| "server closed the connection".to_string()),
                    ));
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(VncError::ConnectionClosed);
                }
            }
        }
    }

    /// Requests a full update and returns it as an RGBA image.
    ///
    /// Concurrent calls are serialized. With a target frame rate set,
    /// requests are spaced at least one frame interval apart.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::NotConnected`] outside the connected state and
    /// [`VncError::FramebufferTimeout`] if no update arrives in time.
    pub async fn screenshot(&self) -> Result<RgbaImage> {
        self.ensure_connected()?;
        let mut last_request = self.request_lock.lock().await;

        if let (Some(interval), Some(last)) = (self.options.frame_interval(), *last_request) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        let mut events = self.shared.events.subscribe();
        self.request_update(false).await?;
        *last_request = Some(Instant::now());

        let timeout = self.options.screenshot_timeout;
        let waited = tokio::time::timeout(timeout, async {
            loop {
                match events.recv().await {
                    Ok(ClientEvent::FramebufferUpdated { .. })
                    | Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Ok(ClientEvent::Disconnected { .. })
                    | Err(broadcast::error::RecvError::Closed) => return Err(VncError::NotConnected),
                    Ok(_) => {}
                }
            }
            Ok(self.shared.framebuffer.read().await.snapshot())
        })
        .await;

        waited.unwrap_or(Err(VncError::FramebufferTimeout(timeout)))
    }

    /// Sends a `FramebufferUpdateRequest` for the whole screen.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::NotConnected`] when there is no open connection.
    pub async fn request_update(&self, incremental: bool) -> Result<()> {
        let (width, height) = self.shared.size();
        self.send(ClientMessage::FramebufferUpdateRequest {
            incremental,
            x: 0,
            y: 0,
            width,
            height,
        })
        .await
    }

    /// Sends a pointer event, clamping the position to the screen.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::NotConnected`] outside the connected state.
    pub async fn send_pointer_event(&self, x: i32, y: i32, button_mask: u8) -> Result<()> {
        self.ensure_connected()?;
        let (width, height) = self.shared.size();
        self.send(ClientMessage::PointerEvent {
            button_mask,
            x: clamp_coordinate(x, width),
            y: clamp_coordinate(y, height),
        })
        .await
    }

    /// Sends a key press or release.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::NotConnected`] outside the connected state.
    pub async fn send_key_event(&self, keysym: u32, down: bool) -> Result<()> {
        self.ensure_connected()?;
        self.send(ClientMessage::KeyEvent { down, key: keysym }).await
    }

    /// Sets the server's clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::NotConnected`] outside the connected state.
    pub async fn send_cut_text(&self, text: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(ClientMessage::ClientCutText(text.to_string())).await
    }

    async fn send(&self, message: ClientMessage) -> Result<()> {
        let mut buf = BytesMut::new();
        message.write_to(&mut buf);

        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(VncError::NotConnected)?;
        stream.write_all(&buf).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Closes the connection. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let was_open = self.writer.lock().await.is_some();
        self.teardown().await;
        self.shared.state.send_replace(ConnectionState::Disconnected);
        if was_open {
            log::info!("Disconnected from {}", self.options.address());
        }
    }

    async fn teardown(&self) {
        if let Some(handle) = self
            .reader_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                log::warn!("Error shutting down VNC socket: {e}");
            }
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(VncError::NotConnected)
        }
    }

    /// Current framebuffer size; `(0, 0)` before the handshake.
    #[must_use]
    pub fn screen_size(&self) -> (u16, u16) {
        self.shared.size()
    }

    /// Desktop name from `ServerInit`.
    #[must_use]
    pub fn server_name(&self) -> Option<String> {
        self.session_info().map(|s| s.name)
    }

    /// Negotiated protocol version.
    #[must_use]
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.session_info().map(|s| s.version)
    }

    /// Security type used for this connection.
    #[must_use]
    pub fn security_type(&self) -> Option<SecurityType> {
        self.session_info().map(|s| s.security)
    }

    fn session_info(&self) -> Option<SessionInfo> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watches connection state transitions.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Subscribes to [`ClientEvent`]s from this connection.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(handle) = self
            .reader_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped into u16 range
fn clamp_coordinate(value: i32, extent: u16) -> u16 {
    let max = i32::from(extent.saturating_sub(1));
    value.clamp(0, max) as u16
}

/// Reads server messages until the stream ends or a message cannot be
/// framed.
///
/// Updates are decoded into `working`, which only this task owns, and
/// copied into the shared framebuffer once complete.
///
/// Returns `Ok(())` on a clean end of stream.
async fn read_loop<R>(
    reader: &mut R,
    shared: &Shared,
    mut working: Framebuffer,
    version: ProtocolVersion,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut decoders = Decoders::new();
    let mut first_frame = true;

    loop {
        let message_type = match reader.read_u8().await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match message_type {
            SERVER_MSG_FRAMEBUFFER_UPDATE => {
                let rectangles =
                    read_framebuffer_update(reader, shared, &mut working, &mut decoders).await?;
                *shared.framebuffer.write().await = working.clone();
                if first_frame {
                    first_frame = false;
                    let (width, height) = shared.size();
                    shared.state.send_replace(ConnectionState::Connected);
                    log::info!("VNC connected ({version}, {width}x{height})");
                    shared.emit(ClientEvent::Connected {
                        version,
                        width,
                        height,
                    });
                }
                shared.emit(ClientEvent::FramebufferUpdated { rectangles });
            }
            SERVER_MSG_SET_COLOUR_MAP_ENTRIES => {
                // True colour is always requested; the map is ignored
                let mut header = [0u8; 5];
                reader.read_exact(&mut header).await?;
                let count = usize::from(u16::from_be_bytes([header[3], header[4]]));
                let mut entries = vec![0u8; count * 6];
                reader.read_exact(&mut entries).await?;
                log::debug!("Skipped SetColourMapEntries with {count} colours");
            }
            SERVER_MSG_BELL => {
                log::debug!("Bell");
                shared.emit(ClientEvent::Bell);
            }
            SERVER_MSG_SERVER_CUT_TEXT => {
                let mut padding = [0u8; 3];
                reader.read_exact(&mut padding).await?;
                let length = reader.read_u32().await? as usize;
                if length > MAX_CUT_TEXT {
                    return Err(VncError::Protocol(format!(
                        "ServerCutText of {length} bytes exceeds limit"
                    )));
                }
                let mut text = vec![0u8; length];
                reader.read_exact(&mut text).await?;
                let text: String = text.into_iter().map(char::from).collect();
                log::debug!("Server clipboard updated ({length} bytes)");
                shared.emit(ClientEvent::ServerCutText { text });
            }
            other => {
                return Err(VncError::Protocol(format!(
                    "unsupported server message type {other}"
                )));
            }
        }
    }
}

/// Applies one `FramebufferUpdate` to `fb`.
///
/// No lock is taken here, so a server that stalls mid-update never blocks
/// readers of the shared framebuffer.
async fn read_framebuffer_update<R>(
    reader: &mut R,
    shared: &Shared,
    fb: &mut Framebuffer,
    decoders: &mut Decoders,
) -> Result<u16>
where
    R: AsyncRead + Unpin,
{
    let _padding = reader.read_u8().await?;
    let count = reader.read_u16().await?;

    for _ in 0..count {
        let rect = Rectangle::read_from(reader).await?;
        log::debug!(
            "Rect {}x{}+{}+{} {}",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            encoding_name(rect.encoding)
        );

        if rect.encoding == ENCODING_DESKTOP_SIZE {
            fb.resize(rect.width, rect.height);
            shared.set_size(rect.width, rect.height);
            log::info!("Desktop resized to {}x{}", rect.width, rect.height);
            shared.emit(ClientEvent::Resized {
                width: rect.width,
                height: rect.height,
            });
            continue;
        }

        decoders.decode(reader, &rect, fb).await?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeServer, FakeServerConfig};

    fn options_for(server: &FakeServer) -> ConnectionOptions {
        ConnectionOptions::new("127.0.0.1")
            .with_port(server.port())
            .with_connect_timeout(Duration::from_secs(5))
            .with_screenshot_timeout(Duration::from_millis(500))
    }

    #[test]
    fn test_clamp_coordinate() {
        assert_eq!(clamp_coordinate(-5, 100), 0);
        assert_eq!(clamp_coordinate(50, 100), 50);
        assert_eq!(clamp_coordinate(100, 100), 99);
        assert_eq!(clamp_coordinate(7, 0), 0);
    }

    #[tokio::test]
    async fn test_not_connected_errors() {
        let transport = Transport::new(ConnectionOptions::new("127.0.0.1"));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert!(matches!(
            transport.send_pointer_event(1, 1, 0).await,
            Err(VncError::NotConnected)
        ));
        assert!(matches!(
            transport.send_key_event(0x61, true).await,
            Err(VncError::NotConnected)
        ));
        assert!(matches!(
            transport.screenshot().await,
            Err(VncError::NotConnected)
        ));
        assert!(matches!(
            transport.request_update(false).await,
            Err(VncError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let transport = Transport::new(ConnectionOptions::new("127.0.0.1"));
        transport.disconnect().await;
        transport.disconnect().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_and_screenshot() {
        let server = FakeServer::start(FakeServerConfig {
            width: 8,
            height: 6,
            colour: [10, 20, 30],
            ..FakeServerConfig::default()
        })
        .await;
        let transport = Transport::new(options_for(&server));
        transport.connect().await.unwrap();

        assert!(transport.is_connected());
        assert_eq!(transport.screen_size(), (8, 6));
        assert_eq!(transport.server_name().as_deref(), Some("fake"));
        assert_eq!(transport.protocol_version(), Some(ProtocolVersion::V3_8));
        assert_eq!(transport.security_type(), Some(SecurityType::None));

        let image = transport.screenshot().await.unwrap();
        assert_eq!((image.width, image.height), (8, 6));
        assert_eq!(image.data.len(), 8 * 6 * 4);
        assert_eq!(image.pixel(7, 5), Some([10, 20, 30, 255]));

        transport.disconnect().await;
        transport.disconnect().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert!(matches!(
            transport.screenshot().await,
            Err(VncError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_pointer_is_clamped_on_the_wire() {
        let mut server = FakeServer::start(FakeServerConfig {
            width: 100,
            height: 50,
            ..FakeServerConfig::default()
        })
        .await;
        let transport = Transport::new(options_for(&server));
        transport.connect().await.unwrap();
        server.drain().await;

        transport.send_pointer_event(500, -3, 1).await.unwrap();
        transport.send_key_event(0xff0d, true).await.unwrap();

        assert_eq!(
            server.next_message().await,
            Some(ClientMessage::PointerEvent {
                button_mask: 1,
                x: 99,
                y: 0
            })
        );
        assert_eq!(
            server.next_message().await,
            Some(ClientMessage::KeyEvent {
                down: true,
                key: 0xff0d
            })
        );
    }

    #[tokio::test]
    async fn test_initial_messages() {
        let mut server = FakeServer::start(FakeServerConfig::default()).await;
        let transport = Transport::new(options_for(&server));
        transport.connect().await.unwrap();

        assert_eq!(
            server.next_message().await,
            Some(ClientMessage::SetPixelFormat(PixelFormat::rgb888()))
        );
        assert_eq!(
            server.next_message().await,
            Some(ClientMessage::SetEncodings(vec![16, 5, 1, 0, -223]))
        );
        assert!(matches!(
            server.next_message().await,
            Some(ClientMessage::FramebufferUpdateRequest {
                incremental: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_screenshot_timeout_is_recoverable() {
        let server = FakeServer::start(FakeServerConfig {
            answered_requests: 1,
            ..FakeServerConfig::default()
        })
        .await;
        let transport = Transport::new(options_for(&server));
        transport.connect().await.unwrap();

        let err = transport.screenshot().await.unwrap_err();
        assert!(matches!(err, VncError::FramebufferTimeout(_)));
        assert_eq!(err.to_string(), "Framebuffer update timeout after 500ms");
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_desktop_resize_and_server_events() {
        let server = FakeServer::start(FakeServerConfig {
            width: 4,
            height: 4,
            resize_to: Some((6, 3)),
            send_bell_and_cut_text: true,
            ..FakeServerConfig::default()
        })
        .await;
        let transport = Transport::new(options_for(&server));
        let mut events = transport.subscribe();
        transport.connect().await.unwrap();

        let mut saw_bell = false;
        let mut cut_text = None;
        transport.screenshot().await.unwrap();
        while let Ok(event) = events.try_recv() {
            match event {
                ClientEvent::Bell => saw_bell = true,
                ClientEvent::ServerCutText { text } => cut_text = Some(text),
                _ => {}
            }
        }
        assert!(saw_bell);
        assert_eq!(cut_text.as_deref(), Some("caf\u{e9}"));
        assert_eq!(transport.screen_size(), (6, 3));
        let image = transport.screenshot().await.unwrap();
        assert_eq!((image.width, image.height), (6, 3));
    }

    #[tokio::test]
    async fn test_version_mismatch_fails_connect() {
        let server = FakeServer::start(FakeServerConfig {
            version: *b"RFB 004.001\n",
            ..FakeServerConfig::default()
        })
        .await;
        let transport = Transport::new(options_for(&server));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, VncError::VersionMismatch(_)));
        assert_eq!(transport.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_password_auth_against_fake_server() {
        let server = FakeServer::start(FakeServerConfig {
            password: Some("secret".to_string()),
            ..FakeServerConfig::default()
        })
        .await;

        let transport = Transport::new(options_for(&server).with_password("secret"));
        transport.connect().await.unwrap();
        assert_eq!(transport.security_type(), Some(SecurityType::VncPassword));
        transport.disconnect().await;
    }

    #[tokio::test]
    async fn test_wrong_password_fails() {
        let server = FakeServer::start(FakeServerConfig {
            password: Some("secret".to_string()),
            ..FakeServerConfig::default()
        })
        .await;

        let transport = Transport::new(options_for(&server).with_password("guess"));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, VncError::Authentication(_)));
        assert_eq!(transport.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        // Accepts the socket but never speaks
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _accept = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let transport = Transport::new(
            ConnectionOptions::new("127.0.0.1")
                .with_port(port)
                .with_connect_timeout(Duration::from_millis(200)),
        );
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, VncError::ConnectTimeout(_)));
        assert_eq!(err.to_string(), "VNC connection timeout after 200ms");
    }

    #[tokio::test]
    async fn test_connect_over_duplex_stream() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let config = FakeServerConfig {
            width: 2,
            height: 2,
            colour: [255, 0, 0],
            ..FakeServerConfig::default()
        };
        let (messages, _rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(crate::testing::serve(server, config, messages));

        let transport = Transport::new(ConnectionOptions::new("duplex"));
        transport.connect_stream(client).await.unwrap();
        let image = transport.screenshot().await.unwrap();
        assert_eq!(image.pixel(1, 1), Some([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_stalled_update_times_out_screenshot() {
        let server = FakeServer::start(FakeServerConfig {
            answered_requests: 1,
            stall_midway: true,
            ..FakeServerConfig::default()
        })
        .await;
        let transport = Transport::new(
            options_for(&server).with_screenshot_timeout(Duration::from_millis(300)),
        );
        transport.connect().await.unwrap();

        let started = Instant::now();
        let outcome = tokio::time::timeout(Duration::from_secs(3), transport.screenshot())
            .await
            .expect("screenshot must not hang on a half-sent update");
        assert!(matches!(outcome, Err(VncError::FramebufferTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_stops_previous_reader() {
        let (client_a, server_a) = tokio::io::duplex(64 * 1024);
        let (stop_a, stopped_a) = tokio::sync::oneshot::channel::<()>();
        let (messages_a, _rx_a) = tokio::sync::mpsc::unbounded_channel();
        let config_a = FakeServerConfig {
            width: 4,
            height: 4,
            ..FakeServerConfig::default()
        };
        tokio::spawn(async move {
            tokio::select! {
                () = crate::testing::serve(server_a, config_a, messages_a) => {}
                _ = stopped_a => {}
            }
        });

        let (client_b, server_b) = tokio::io::duplex(64 * 1024);
        let (messages_b, _rx_b) = tokio::sync::mpsc::unbounded_channel();
        let config_b = FakeServerConfig {
            width: 8,
            height: 6,
            ..FakeServerConfig::default()
        };
        tokio::spawn(crate::testing::serve(server_b, config_b, messages_b));

        let transport = Transport::new(ConnectionOptions::new("duplex"));
        transport.connect_stream(client_a).await.unwrap();
        assert_eq!(transport.screen_size(), (4, 4));

        transport.connect_stream(client_b).await.unwrap();
        assert_eq!(transport.screen_size(), (8, 6));
        let mut events = transport.subscribe();

        // Closing the first server must not be seen by the second connection
        let _ = stop_a.send(());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(transport.is_connected());
        assert_eq!(transport.screen_size(), (8, 6));
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, ClientEvent::Disconnected { .. }));
        }
        let image = transport.screenshot().await.unwrap();
        assert_eq!((image.width, image.height), (8, 6));
    }
}
