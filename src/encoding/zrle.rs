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

//! ZRLE (Zlib Run-Length Encoding) decoding.
//!
//! Each ZRLE rectangle is a big-endian u32 length followed by that many bytes
//! of zlib data. All rectangles of a connection share one zlib stream, so the
//! inflater persists in [`ZrleDecoder`].
//!
//! # Tile Sub-encodings
//!
//! The inflated data describes 64x64 tiles, each starting with a
//! sub-encoding byte:
//! - **0 Raw:** `w * h` CPIXELs.
//! - **1 Solid:** a single CPIXEL.
//! - **2-16 Packed Palette:** palette of CPIXELs, then 1/2/4-bit indices,
//!   each row padded to a byte boundary.
//! - **128 Plain RLE:** runs of (CPIXEL, length).
//! - **130-255 Palette RLE:** palette, then indices with bit 7 flagging a run.
//!
//! Run lengths are one plus the sum of the length bytes, where every 255
//! byte means another byte follows.

use bytes::Buf;
use flate2::{Decompress, FlushDecompress, Status};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::protocol::{PixelFormat, Rectangle};

const TILE_SIZE: u16 = 64;

/// Largest compressed payload accepted for one rectangle.
const MAX_COMPRESSED_LENGTH: usize = 64 * 1024 * 1024;

/// Persistent ZRLE state for one connection.
pub struct ZrleDecoder {
    inflater: Decompress,
}

impl Default for ZrleDecoder {
    fn default() -> Self {
        Self {
            inflater: Decompress::new(true),
        }
    }
}

impl ZrleDecoder {
    /// Reads and applies one ZRLE rectangle.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for corrupt zlib data or tile streams, and
    /// I/O errors from the reader.
    pub async fn decode<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        rect: &Rectangle,
        framebuffer: &mut Framebuffer,
    ) -> Result<()> {
        let length = reader.read_u32().await? as usize;
        if length > MAX_COMPRESSED_LENGTH {
            return Err(VncError::Protocol(format!(
                "ZRLE payload of {length} bytes exceeds limit"
            )));
        }
        let mut compressed = vec![0u8; length];
        reader.read_exact(&mut compressed).await?;

        let data = self.inflate(&compressed)?;
        log::debug!(
            "ZRLE: inflated {}->{} bytes ({}x{})",
            compressed.len(),
            data.len(),
            rect.width,
            rect.height
        );

        decode_tiles(&mut &data[..], rect, framebuffer)
    }

    #[allow(clippy::cast_possible_truncation)] // Counter deltas are bounded by buffer sizes
    fn inflate(&mut self, mut input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() * 4 + 4096);
        loop {
            if out.len() == out.capacity() {
                out.reserve(out.capacity().max(4096));
            }
            let before_in = self.inflater.total_in();
            let before_out = self.inflater.total_out();

            let status = self
                .inflater
                .decompress_vec(input, &mut out, FlushDecompress::Sync)
                .map_err(|e| VncError::Protocol(format!("ZRLE zlib error: {e}")))?;

            let consumed = (self.inflater.total_in() - before_in) as usize;
            let produced = self.inflater.total_out() - before_out;
            input = &input[consumed..];

            let room_left = out.len() < out.capacity();
            if status == Status::StreamEnd
                || (room_left && (input.is_empty() || (consumed == 0 && produced == 0)))
            {
                break;
            }
        }
        Ok(out)
    }
}

fn underflow() -> VncError {
    VncError::Protocol("ZRLE tile data ended early".to_string())
}

/// Reads one CPIXEL and expands it to a full pixel in `format`.
fn read_cpixel(data: &mut &[u8], format: &PixelFormat) -> Result<[u8; 4]> {
    let mut pixel = [0u8; 4];
    match format.compact_cpixel() {
        Some(offset) => {
            if data.remaining() < 3 {
                return Err(underflow());
            }
            data.copy_to_slice(&mut pixel[offset..offset + 3]);
        }
        None => {
            let bpp = format.bytes_per_pixel();
            if data.remaining() < bpp {
                return Err(underflow());
            }
            data.copy_to_slice(&mut pixel[..bpp]);
        }
    }
    Ok(pixel)
}

fn read_u8(data: &mut &[u8]) -> Result<u8> {
    if data.has_remaining() {
        Ok(data.get_u8())
    } else {
        Err(underflow())
    }
}

fn read_run_length(data: &mut &[u8]) -> Result<usize> {
    let mut length = 1;
    loop {
        let byte = read_u8(data)?;
        length += usize::from(byte);
        if byte != 255 {
            return Ok(length);
        }
    }
}

fn read_palette(data: &mut &[u8], size: usize, format: &PixelFormat) -> Result<Vec<[u8; 4]>> {
    (0..size).map(|_| read_cpixel(data, format)).collect()
}

fn decode_tiles(data: &mut &[u8], rect: &Rectangle, framebuffer: &mut Framebuffer) -> Result<()> {
    let format = framebuffer.format().clone();
    let bpp = format.bytes_per_pixel();

    for tile_y in (rect.y..rect.y + rect.height).step_by(usize::from(TILE_SIZE)) {
        for tile_x in (rect.x..rect.x + rect.width).step_by(usize::from(TILE_SIZE)) {
            let tile_w = TILE_SIZE.min(rect.x + rect.width - tile_x);
            let tile_h = TILE_SIZE.min(rect.y + rect.height - tile_y);
            let pixel_count = usize::from(tile_w) * usize::from(tile_h);

            let subencoding = read_u8(data)?;
            let pixels: Vec<[u8; 4]> = match subencoding {
                0 => (0..pixel_count)
                    .map(|_| read_cpixel(data, &format))
                    .collect::<Result<_>>()?,
                1 => {
                    let colour = read_cpixel(data, &format)?;
                    framebuffer.fill(tile_x, tile_y, tile_w, tile_h, &colour[..bpp])?;
                    continue;
                }
                2..=16 => {
                    let palette = read_palette(data, usize::from(subencoding), &format)?;
                    unpack_palette(data, &palette, usize::from(tile_w), usize::from(tile_h))?
                }
                128 => {
                    let mut pixels = Vec::with_capacity(pixel_count);
                    while pixels.len() < pixel_count {
                        let colour = read_cpixel(data, &format)?;
                        let run = read_run_length(data)?;
                        pixels.extend(std::iter::repeat(colour).take(run));
                    }
                    pixels
                }
                130..=255 => {
                    let palette = read_palette(data, usize::from(subencoding - 128), &format)?;
                    let mut pixels = Vec::with_capacity(pixel_count);
                    while pixels.len() < pixel_count {
                        let index = read_u8(data)?;
                        let colour = *palette
                            .get(usize::from(index & 0x7f))
                            .ok_or_else(|| VncError::Protocol("ZRLE palette index out of range".to_string()))?;
                        let run = if index & 0x80 != 0 {
                            read_run_length(data)?
                        } else {
                            1
                        };
                        pixels.extend(std::iter::repeat(colour).take(run));
                    }
                    pixels
                }
                other => {
                    return Err(VncError::Protocol(format!(
                        "invalid ZRLE tile sub-encoding {other}"
                    )))
                }
            };

            if pixels.len() != pixel_count {
                return Err(VncError::Protocol("ZRLE run overflows tile".to_string()));
            }
            let bytes: Vec<u8> = pixels.iter().flat_map(|p| p[..bpp].iter().copied()).collect();
            framebuffer.put_pixels(tile_x, tile_y, tile_w, tile_h, &bytes)?;
        }
    }

    Ok(())
}

/// Unpacks 1/2/4-bit palette indices; rows are padded to whole bytes.
fn unpack_palette(
    data: &mut &[u8],
    palette: &[[u8; 4]],
    width: usize,
    height: usize,
) -> Result<Vec<[u8; 4]>> {
    let bits = match palette.len() {
        2 => 1,
        3..=4 => 2,
        _ => 4,
    };
    let row_bytes = (width * bits).div_ceil(8);
    let mask = (1u8 << bits) - 1;

    let mut pixels = Vec::with_capacity(width * height);
    for _ in 0..height {
        if data.remaining() < row_bytes {
            return Err(underflow());
        }
        let row = &data[..row_bytes];
        for x in 0..width {
            let bit = x * bits;
            let shift = 8 - bits - (bit % 8);
            let index = (row[bit / 8] >> shift) & mask;
            let colour = palette
                .get(usize::from(index))
                .ok_or_else(|| VncError::Protocol("ZRLE palette index out of range".to_string()))?;
            pixels.push(*colour);
        }
        data.advance(row_bytes);
    }
    Ok(pixels)
}
