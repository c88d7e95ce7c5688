//! Client events that can be received by the application.

use crate::protocol::ProtocolVersion;

/// Events emitted by a VNC client transport.
///
/// Delivered through a `tokio::sync::broadcast` channel; slow subscribers may
/// observe `RecvError::Lagged` and should re-request state rather than rely on
/// every event arriving.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The handshake finished and the first framebuffer update was applied.
    Connected {
        /// Negotiated protocol version.
        version: ProtocolVersion,
        /// Framebuffer width.
        width: u16,
        /// Framebuffer height.
        height: u16,
    },

    /// A complete `FramebufferUpdate` message was applied.
    FramebufferUpdated {
        /// Number of rectangles in the update.
        rectangles: u16,
    },

    /// The server changed the desktop size (`DesktopSize` pseudo-encoding).
    Resized {
        /// New framebuffer width.
        width: u16,
        /// New framebuffer height.
        height: u16,
    },

    /// The server rang the bell.
    Bell,

    /// Clipboard text received from the server.
    ServerCutText {
        /// Clipboard text content, decoded as Latin-1.
        text: String,
    },

    /// The connection ended.
    Disconnected {
        /// Why the connection ended, if it was not a local disconnect.
        reason: Option<String>,
    },
}
