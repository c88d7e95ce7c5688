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

//! VNC Remote Framebuffer (RFB) protocol constants and structures.
//!
//! This module provides the client-side building blocks for VNC protocol communication,
//! including protocol version negotiation, message types, security types, encodings,
//! and pixel format definitions. It implements the RFB protocol as specified in RFC 6143.
//!
//! # Protocol Overview
//!
//! The VNC RFB protocol operates in the following phases:
//! 1. **Protocol Version** - Server announces a version, the client echoes it back
//! 2. **Security Handshake** - Authentication method selection and execution
//! 3. **Initialization** - `ClientInit` / `ServerInit` exchange of framebuffer parameters
//! 4. **Normal Operation** - Input events flow to the server, screen updates flow back

use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Length of every RFB protocol version string, including the trailing newline.
pub const VERSION_LENGTH: usize = 12;

// Client-to-Server Message Types

/// Message type: Client requests to change the pixel format.
pub const CLIENT_MSG_SET_PIXEL_FORMAT: u8 = 0;

/// Message type: Client specifies supported encodings, ordered by preference.
pub const CLIENT_MSG_SET_ENCODINGS: u8 = 2;

/// Message type: Client requests a framebuffer update.
///
/// The client can request either an incremental update (changes only) or
/// a full refresh of a specified rectangular region.
pub const CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;

/// Message type: Client sends a keyboard event.
pub const CLIENT_MSG_KEY_EVENT: u8 = 4;

/// Message type: Client sends a pointer (mouse) event.
pub const CLIENT_MSG_POINTER_EVENT: u8 = 5;

/// Message type: Client sends cut text (clipboard data).
pub const CLIENT_MSG_CLIENT_CUT_TEXT: u8 = 6;

// Server-to-Client Message Types

/// Message type: Server sends a framebuffer update.
///
/// Contains one or more rectangles of pixel data representing screen changes.
pub const SERVER_MSG_FRAMEBUFFER_UPDATE: u8 = 0;

/// Message type: Server sets colour map entries.
///
/// Only meaningful for colour-mapped pixel formats; the client skips it.
pub const SERVER_MSG_SET_COLOUR_MAP_ENTRIES: u8 = 1;

/// Message type: Server sends a bell (beep) notification.
pub const SERVER_MSG_BELL: u8 = 2;

/// Message type: Server sends cut text (clipboard data).
pub const SERVER_MSG_SERVER_CUT_TEXT: u8 = 3;

// Encoding Types

/// Encoding type: Raw pixel data.
///
/// The simplest encoding that sends uncompressed pixel data directly.
/// High bandwidth but universally supported.
pub const ENCODING_RAW: i32 = 0;

/// Encoding type: Copy Rectangle.
///
/// Instructs the client to copy a rectangular region from one location
/// to another on the screen. Highly efficient for scrolling operations.
pub const ENCODING_COPYRECT: i32 = 1;

/// Encoding type: Hextile.
///
/// Divides rectangles into 16x16 tiles for efficient encoding.
pub const ENCODING_HEXTILE: i32 = 5;

/// Encoding type: Zlib compressed TRLE.
pub const ENCODING_ZRLE: i32 = 16;

/// Pseudo-encoding: Desktop Size.
///
/// Notifies the client of framebuffer dimension changes.
pub const ENCODING_DESKTOP_SIZE: i32 = -223;

// Hextile subencoding flags

/// Hextile: Raw pixel data for this tile.
pub const HEXTILE_RAW: u8 = 1 << 0;

/// Hextile: Background color is specified.
pub const HEXTILE_BACKGROUND_SPECIFIED: u8 = 1 << 1;

/// Hextile: Foreground color is specified.
pub const HEXTILE_FOREGROUND_SPECIFIED: u8 = 1 << 2;

/// Hextile: Tile contains subrectangles.
pub const HEXTILE_ANY_SUBRECTS: u8 = 1 << 3;

/// Hextile: Subrectangles are colored (not monochrome).
pub const HEXTILE_SUBRECTS_COLOURED: u8 = 1 << 4;

// Security Types

/// Security type: Invalid. Sent by the server in place of a list to signal failure.
pub const SECURITY_TYPE_INVALID: u8 = 0;

/// Security type: None (no authentication).
pub const SECURITY_TYPE_NONE: u8 = 1;

/// Security type: VNC Authentication.
///
/// Standard VNC authentication using DES-encrypted challenge-response.
/// The server sends a 16-byte challenge, which the client encrypts with
/// the password and returns.
pub const SECURITY_TYPE_VNC_AUTH: u8 = 2;

/// Security type: NTLM challenge/response authentication.
pub const SECURITY_TYPE_NTLM: u8 = 4;

/// Security type: Apple Remote Desktop (Diffie-Hellman + AES-128), used by macOS Screen Sharing.
pub const SECURITY_TYPE_ARD: u8 = 30;

// Security Results

/// Security result: Authentication successful.
pub const SECURITY_RESULT_OK: u32 = 0;

/// Security result: Authentication failed.
pub const SECURITY_RESULT_FAILED: u32 = 1;

/// Pointer button masks used in `PointerEvent` messages.
pub mod button {
    /// Left mouse button.
    pub const LEFT: u8 = 1;
    /// Middle mouse button.
    pub const MIDDLE: u8 = 2;
    /// Right mouse button.
    pub const RIGHT: u8 = 4;
    /// Wheel up (button 4).
    pub const SCROLL_UP: u8 = 8;
    /// Wheel down (button 5).
    pub const SCROLL_DOWN: u8 = 16;
    /// Wheel left (button 6).
    pub const SCROLL_LEFT: u8 = 32;
    /// Wheel right (button 7).
    pub const SCROLL_RIGHT: u8 = 64;
}

/// How the security phase is framed for a given protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityFlow {
    /// RFB 3.3: the server dictates a single u32 security type.
    ServerChosen,
    /// RFB 3.7: the client picks from a list; no `SecurityResult` after `None`.
    ClientChosen,
    /// RFB 3.8: the client picks from a list; `SecurityResult` is always sent
    /// and carries a reason string on failure.
    ClientChosenWithReason,
}

/// A protocol version this client is able to speak.
///
/// The server's 12-byte announcement must match one of these exactly; the
/// client then echoes the identical string back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// `RFB 003.003`
    V3_3,
    /// `RFB 003.006`, announced by UltraVNC; behaves as 3.3.
    V3_6,
    /// `RFB 003.007`
    V3_7,
    /// `RFB 003.008`
    V3_8,
    /// `RFB 003.889`, announced by macOS Screen Sharing; behaves as 3.8.
    V3_889,
}

impl ProtocolVersion {
    /// All supported versions, in the order they are matched.
    pub const SUPPORTED: [ProtocolVersion; 5] = [
        ProtocolVersion::V3_3,
        ProtocolVersion::V3_6,
        ProtocolVersion::V3_7,
        ProtocolVersion::V3_8,
        ProtocolVersion::V3_889,
    ];

    /// The exact 12-byte wire representation.
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8; VERSION_LENGTH] {
        match self {
            ProtocolVersion::V3_3 => b"RFB 003.003\n",
            ProtocolVersion::V3_6 => b"RFB 003.006\n",
            ProtocolVersion::V3_7 => b"RFB 003.007\n",
            ProtocolVersion::V3_8 => b"RFB 003.008\n",
            ProtocolVersion::V3_889 => b"RFB 003.889\n",
        }
    }

    /// Matches a server announcement against the supported table.
    ///
    /// Returns `None` for anything that is not byte-for-byte one of the
    /// supported strings.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::SUPPORTED
            .into_iter()
            .find(|version| version.as_bytes().as_slice() == bytes)
    }

    /// The security phase framing used by this version.
    #[must_use]
    pub fn security_flow(self) -> SecurityFlow {
        match self {
            ProtocolVersion::V3_3 | ProtocolVersion::V3_6 => SecurityFlow::ServerChosen,
            ProtocolVersion::V3_7 => SecurityFlow::ClientChosen,
            ProtocolVersion::V3_8 | ProtocolVersion::V3_889 => {
                SecurityFlow::ClientChosenWithReason
            }
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = std::str::from_utf8(self.as_bytes()).unwrap_or("RFB ???.???\n");
        f.write_str(text.trim_end())
    }
}

/// Represents the pixel format of the VNC framebuffer.
///
/// This struct defines how pixel data is interpreted, including color depth,
/// endianness, and RGB component details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    /// Number of bits per pixel.
    pub bits_per_pixel: u8,
    /// Depth of the pixel in bits.
    pub depth: u8,
    /// Flag indicating if the pixel data is big-endian (1) or little-endian (0).
    pub big_endian_flag: u8,
    /// Flag indicating if the pixel format is true-colour (1) or colormapped (0).
    pub true_colour_flag: u8,
    /// Maximum red color value.
    pub red_max: u16,
    /// Maximum green color value.
    pub green_max: u16,
    /// Maximum blue color value.
    pub blue_max: u16,
    /// Number of shifts to apply to get the red color component.
    pub red_shift: u8,
    /// Number of shifts to apply to get the green color component.
    pub green_shift: u8,
    /// Number of shifts to apply to get the blue color component.
    pub blue_shift: u8,
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::rgb888()
    }
}

impl PixelFormat {
    /// The format this client requests after `ServerInit`.
    ///
    /// 32 bits per pixel, depth 24, little-endian, red at bits 16-23, green at
    /// 8-15 and blue at 0-7 (`0x00RRGGBB`, laid out in memory as `BB GG RR 00`).
    #[must_use]
    pub fn rgb888() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// 16-bit RGB565, as some servers announce in `ServerInit`.
    #[cfg(test)]
    pub(crate) fn rgb565() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 16,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 31,   // 5 bits
            green_max: 63, // 6 bits
            blue_max: 31,  // 5 bits
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
        }
    }

    /// Number of bytes each pixel occupies on the wire and in the framebuffer.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bits_per_pixel / 8)
    }

    /// Validates that this pixel format can be decoded by the client.
    ///
    /// Checks that the format uses valid bits-per-pixel values, is true-colour,
    /// and that the colour components fit the declared depth.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if !matches!(self.bits_per_pixel, 8 | 16 | 24 | 32) {
            return false;
        }

        if self.depth == 0 || self.depth > 32 {
            return false;
        }

        // Colour-mapped formats would need SetColourMapEntries handling
        if self.true_colour_flag == 0 {
            return false;
        }

        #[allow(clippy::cast_possible_truncation)]
        // leading_zeros() returns max 16, result always fits in u8
        let bits_needed = |max: u16| -> u8 { (16 - max.leading_zeros()) as u8 };

        let red_bits = bits_needed(self.red_max);
        let green_bits = bits_needed(self.green_max);
        let blue_bits = bits_needed(self.blue_max);

        if red_bits + green_bits + blue_bits > self.depth {
            return false;
        }

        self.red_shift < 32 && self.green_shift < 32 && self.blue_shift < 32
    }

    /// Size of a ZRLE compressed pixel (CPIXEL) in this format.
    ///
    /// RFC 6143 §7.7.6: for 32bpp true-colour formats whose colour bits all
    /// fit in either the least or the most significant three bytes, a CPIXEL
    /// is three bytes; otherwise it is a full pixel.
    #[must_use]
    pub fn cpixel_size(&self) -> usize {
        if self.compact_cpixel().is_some() {
            3
        } else {
            self.bytes_per_pixel()
        }
    }

    /// For three-byte CPIXELs, the byte offset within the in-memory pixel
    /// where the three significant bytes start.
    pub(crate) fn compact_cpixel(&self) -> Option<usize> {
        if self.bits_per_pixel != 32 || self.depth > 24 || self.true_colour_flag == 0 {
            return None;
        }
        let mask = (u32::from(self.red_max) << self.red_shift)
            | (u32::from(self.green_max) << self.green_shift)
            | (u32::from(self.blue_max) << self.blue_shift);
        let fits_low = mask & 0xFF00_0000 == 0;
        let fits_high = mask & 0x0000_00FF == 0;
        match (fits_low, fits_high, self.big_endian_flag != 0) {
            (true, _, false) => Some(0),
            (true, _, true) => Some(1),
            (false, true, false) => Some(1),
            (false, true, true) => Some(0),
            _ => None,
        }
    }

    /// Writes the pixel format data into a `BytesMut` buffer.
    ///
    /// This function serializes the `PixelFormat` into the 16-byte RFB wire format.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.bits_per_pixel);
        buf.put_u8(self.depth);
        buf.put_u8(self.big_endian_flag);
        buf.put_u8(self.true_colour_flag);
        buf.put_u16(self.red_max);
        buf.put_u16(self.green_max);
        buf.put_u16(self.blue_max);
        buf.put_u8(self.red_shift);
        buf.put_u8(self.green_shift);
        buf.put_u8(self.blue_shift);
        buf.put_bytes(0, 3); // padding
    }

    /// Reads and deserializes a `PixelFormat` from a buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err(io::Error)` if there are not enough bytes in the buffer
    /// to read a complete `PixelFormat`.
    pub fn from_bytes<B: Buf>(buf: &mut B) -> io::Result<Self> {
        if buf.remaining() < 16 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Not enough bytes for PixelFormat",
            ));
        }

        let pf = Self {
            bits_per_pixel: buf.get_u8(),
            depth: buf.get_u8(),
            big_endian_flag: buf.get_u8(),
            true_colour_flag: buf.get_u8(),
            red_max: buf.get_u16(),
            green_max: buf.get_u16(),
            blue_max: buf.get_u16(),
            red_shift: buf.get_u8(),
            green_shift: buf.get_u8(),
            blue_shift: buf.get_u8(),
        };
        buf.advance(3);
        Ok(pf)
    }
}

/// Represents the `ServerInit` message received during VNC initialization.
///
/// This message is sent by the server after the security phase is complete.
/// It provides the client with framebuffer dimensions, pixel format, and
/// the desktop name.
#[derive(Debug, Clone)]
pub struct ServerInit {
    /// The width of the framebuffer in pixels.
    pub framebuffer_width: u16,
    /// The height of the framebuffer in pixels.
    pub framebuffer_height: u16,
    /// The server's native pixel format.
    pub pixel_format: PixelFormat,
    /// The name of the desktop.
    pub name: String,
}

impl ServerInit {
    /// Reads a `ServerInit` message from the stream.
    ///
    /// The format follows the RFB protocol specification:
    /// - 2 bytes: framebuffer width
    /// - 2 bytes: framebuffer height
    /// - 16 bytes: pixel format
    /// - 4 bytes: name length
    /// - N bytes: name string (UTF-8, decoded lossily)
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream ends early.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Self> {
        let framebuffer_width = reader.read_u16().await?;
        let framebuffer_height = reader.read_u16().await?;

        let mut pf_bytes = [0u8; 16];
        reader.read_exact(&mut pf_bytes).await?;
        let pixel_format = PixelFormat::from_bytes(&mut &pf_bytes[..])?;

        let name = read_string(reader).await?;

        Ok(Self {
            framebuffer_width,
            framebuffer_height,
            pixel_format,
            name,
        })
    }

    /// Serializes the `ServerInit` message into a byte buffer.
    #[allow(clippy::cast_possible_truncation)] // Desktop name length limited to u32 per VNC protocol
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.framebuffer_width);
        buf.put_u16(self.framebuffer_height);
        self.pixel_format.write_to(buf);

        let name_bytes = self.name.as_bytes();
        buf.put_u32(name_bytes.len() as u32);
        buf.put_slice(name_bytes);
    }
}

/// Upper bound on length-prefixed strings read from the server.
const MAX_STRING_LENGTH: usize = 1 << 20;

/// Reads a u32-length-prefixed string (reason strings, desktop names).
///
/// # Errors
///
/// Returns an I/O error if the stream ends early or the declared length is absurd.
pub async fn read_string<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let len = reader.read_u32().await? as usize;
    if len > MAX_STRING_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("String length {len} exceeds limit"),
        ));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Represents all possible message types that a VNC client sends to the server.
///
/// This enum encapsulates the various client messages defined in the RFB protocol,
/// so input and update requests are built in a type-safe manner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Client requests a specific pixel format for framebuffer updates.
    SetPixelFormat(PixelFormat),

    /// Client specifies the list of encodings it supports.
    SetEncodings(Vec<i32>),

    /// Client requests a framebuffer update for a specific region.
    FramebufferUpdateRequest {
        /// If true, only send changes since the last update; if false, send full refresh.
        incremental: bool,
        /// X coordinate of the requested region.
        x: u16,
        /// Y coordinate of the requested region.
        y: u16,
        /// Width of the requested region.
        width: u16,
        /// Height of the requested region.
        height: u16,
    },

    /// Client sends a keyboard key event.
    KeyEvent {
        /// True if the key is pressed, false if released.
        down: bool,
        /// The X Window System keysym value of the key.
        key: u32,
    },

    /// Client sends a pointer (mouse) event.
    PointerEvent {
        /// Bitmask of currently pressed mouse buttons.
        button_mask: u8,
        /// X coordinate of the pointer.
        x: u16,
        /// Y coordinate of the pointer.
        y: u16,
    },

    /// Client sends clipboard (cut text) data. Encoded as Latin-1 on the wire.
    ClientCutText(String),
}

impl ClientMessage {
    /// Serializes the message into its wire representation.
    #[allow(clippy::cast_possible_truncation)] // Encoding list and text lengths are bounded by the protocol
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            ClientMessage::SetPixelFormat(pf) => {
                buf.put_u8(CLIENT_MSG_SET_PIXEL_FORMAT);
                buf.put_bytes(0, 3);
                pf.write_to(buf);
            }
            ClientMessage::SetEncodings(encodings) => {
                buf.put_u8(CLIENT_MSG_SET_ENCODINGS);
                buf.put_u8(0);
                buf.put_u16(encodings.len() as u16);
                for encoding in encodings {
                    buf.put_i32(*encoding);
                }
            }
            ClientMessage::FramebufferUpdateRequest {
                incremental,
                x,
                y,
                width,
                height,
            } => {
                buf.put_u8(CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST);
                buf.put_u8(u8::from(*incremental));
                buf.put_u16(*x);
                buf.put_u16(*y);
                buf.put_u16(*width);
                buf.put_u16(*height);
            }
            ClientMessage::KeyEvent { down, key } => {
                buf.put_u8(CLIENT_MSG_KEY_EVENT);
                buf.put_u8(u8::from(*down));
                buf.put_bytes(0, 2);
                buf.put_u32(*key);
            }
            ClientMessage::PointerEvent { button_mask, x, y } => {
                buf.put_u8(CLIENT_MSG_POINTER_EVENT);
                buf.put_u8(*button_mask);
                buf.put_u16(*x);
                buf.put_u16(*y);
            }
            ClientMessage::ClientCutText(text) => {
                let latin1: Vec<u8> = text
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect();
                buf.put_u8(CLIENT_MSG_CLIENT_CUT_TEXT);
                buf.put_bytes(0, 3);
                buf.put_u32(latin1.len() as u32);
                buf.put_slice(&latin1);
            }
        }
    }

    /// Reads one client message from a stream.
    ///
    /// This is the server's view of the wire format; it lets loopback servers
    /// and tests observe exactly what the client sent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error on EOF or an unknown message type.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Self> {
        let message_type = reader.read_u8().await?;
        match message_type {
            CLIENT_MSG_SET_PIXEL_FORMAT => {
                let mut bytes = [0u8; 19];
                reader.read_exact(&mut bytes).await?;
                let pf = PixelFormat::from_bytes(&mut &bytes[3..])?;
                Ok(ClientMessage::SetPixelFormat(pf))
            }
            CLIENT_MSG_SET_ENCODINGS => {
                let _padding = reader.read_u8().await?;
                let count = reader.read_u16().await?;
                let mut encodings = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    encodings.push(reader.read_i32().await?);
                }
                Ok(ClientMessage::SetEncodings(encodings))
            }
            CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST => Ok(ClientMessage::FramebufferUpdateRequest {
                incremental: reader.read_u8().await? != 0,
                x: reader.read_u16().await?,
                y: reader.read_u16().await?,
                width: reader.read_u16().await?,
                height: reader.read_u16().await?,
            }),
            CLIENT_MSG_KEY_EVENT => {
                let down = reader.read_u8().await? != 0;
                let _padding = reader.read_u16().await?;
                let key = reader.read_u32().await?;
                Ok(ClientMessage::KeyEvent { down, key })
            }
            CLIENT_MSG_POINTER_EVENT => Ok(ClientMessage::PointerEvent {
                button_mask: reader.read_u8().await?,
                x: reader.read_u16().await?,
                y: reader.read_u16().await?,
            }),
            CLIENT_MSG_CLIENT_CUT_TEXT => {
                let mut padding = [0u8; 3];
                reader.read_exact(&mut padding).await?;
                let len = reader.read_u32().await? as usize;
                let mut bytes = vec![0u8; len];
                reader.read_exact(&mut bytes).await?;
                Ok(ClientMessage::ClientCutText(
                    bytes.iter().map(|&b| char::from(b)).collect(),
                ))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown client message type: {other}"),
            )),
        }
    }
}

/// Represents a rectangle header in a framebuffer update message.
///
/// Each framebuffer update can contain multiple rectangles, each with its own
/// encoding type. The rectangle header specifies the position, dimensions,
/// and encoding of the pixel data that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    /// X coordinate of the top-left corner.
    pub x: u16,
    /// Y coordinate of the top-left corner.
    pub y: u16,
    /// Width of the rectangle in pixels.
    pub width: u16,
    /// Height of the rectangle in pixels.
    pub height: u16,
    /// The encoding type used for this rectangle's pixel data.
    pub encoding: i32,
}

impl Rectangle {
    /// Reads a 12-byte rectangle header from the stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream ends early.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            x: reader.read_u16().await?,
            y: reader.read_u16().await?,
            width: reader.read_u16().await?,
            height: reader.read_u16().await?,
            encoding: reader.read_i32().await?,
        })
    }

    /// Writes the rectangle header to a byte buffer.
    ///
    /// The header format is:
    /// - 2 bytes: x position
    /// - 2 bytes: y position
    /// - 2 bytes: width
    /// - 2 bytes: height
    /// - 4 bytes: encoding type (signed 32-bit integer)
    pub fn write_header(&self, buf: &mut BytesMut) {
        buf.put_u16(self.x);
        buf.put_u16(self.y);
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        buf.put_i32(self.encoding);
    }

    /// Number of pixels covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}
