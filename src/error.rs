//! Error types for the VNC client library.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for VNC operations.
pub type Result<T> = std::result::Result<T, VncError>;

/// Errors that can occur in VNC client operations.
#[derive(Debug, Error)]
pub enum VncError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TCP-level connection failure.
    #[error("VNC connection error: {0}")]
    Connection(String),

    /// The connection did not complete before the connect timeout.
    #[error("VNC connection timeout after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// The server announced a protocol version this client does not speak.
    #[error("Unsupported RFB protocol version: {0:?}")]
    VersionMismatch(String),

    /// Authentication failed or could not be attempted.
    #[error("VNC authentication failed: {0}")]
    Authentication(String),

    /// None of the security types offered by the server are supported.
    #[error("Unsupported VNC security types: {0:?}")]
    UnsupportedSecurityType(Vec<u32>),

    /// A framebuffer update was not received in time. Callers may retry.
    #[error("Framebuffer update timeout after {}ms", .0.as_millis())]
    FramebufferTimeout(Duration),

    /// An input or screenshot call was made outside the connected state.
    #[error("VNC not connected")]
    NotConnected,

    /// Key name has no keysym mapping.
    #[error("Unknown key: {0:?}")]
    UnknownKey(String),

    /// Modifier name has no keysym mapping.
    #[error("Unknown modifier: {0:?}")]
    UnknownModifier(String),

    /// VNC protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A device action was called with missing or invalid parameters.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Connection closed.
    #[error("VNC connection closed")]
    ConnectionClosed,

    /// Screenshot encoding failed.
    #[cfg(feature = "png")]
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}
