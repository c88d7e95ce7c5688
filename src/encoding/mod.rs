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

//! VNC encoding implementations.
//!
//! This module provides the rectangle decoders for the encodings the client
//! advertises: Raw, CopyRect, Hextile and ZRLE. Each decoder reads one
//! rectangle's payload from the stream and writes it into the framebuffer.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::protocol::{
    Rectangle, ENCODING_COPYRECT, ENCODING_DESKTOP_SIZE, ENCODING_HEXTILE, ENCODING_RAW,
    ENCODING_ZRLE,
};

pub mod copyrect;
pub mod hextile;
pub mod raw;
pub mod zrle;

pub use zrle::ZrleDecoder;

/// Human-readable name of an encoding number.
#[must_use]
pub fn encoding_name(encoding: i32) -> &'static str {
    match encoding {
        ENCODING_RAW => "Raw",
        ENCODING_COPYRECT => "CopyRect",
        ENCODING_HEXTILE => "Hextile",
        ENCODING_ZRLE => "ZRLE",
        ENCODING_DESKTOP_SIZE => "DesktopSize",
        _ => "Unknown",
    }
}

/// Decoder state that must survive across rectangles of one connection.
///
/// ZRLE uses a single zlib stream for the lifetime of the connection, so its
/// inflater lives here.
#[derive(Default)]
pub struct Decoders {
    zrle: ZrleDecoder,
}

impl Decoders {
    /// Creates fresh decoder state for a new connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one rectangle's payload into `framebuffer`.
    ///
    /// Pseudo-encodings are not handled here.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Protocol`] for unsupported encodings or malformed
    /// payloads, and I/O errors from the stream.
    pub async fn decode<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        rect: &Rectangle,
        framebuffer: &mut Framebuffer,
    ) -> Result<()> {
        framebuffer.check_bounds(rect.x, rect.y, rect.width, rect.height)?;
        match rect.encoding {
            ENCODING_RAW => raw::decode(reader, rect, framebuffer).await,
            ENCODING_COPYRECT => copyrect::decode(reader, rect, framebuffer).await,
            ENCODING_HEXTILE => hextile::decode(reader, rect, framebuffer).await,
            ENCODING_ZRLE => self.zrle.decode(reader, rect, framebuffer).await,
            other => Err(VncError::Protocol(format!(
                "server sent unsupported encoding {other}"
            ))),
        }
    }
}

/// Reads one pixel of `bpp` bytes into the front of a 4-byte array.
pub(crate) async fn read_pixel<R: AsyncRead + Unpin>(
    reader: &mut R,
    bpp: usize,
) -> std::io::Result<[u8; 4]> {
    let mut pixel = [0u8; 4];
    reader.read_exact(&mut pixel[..bpp]).await?;
    Ok(pixel)
}
