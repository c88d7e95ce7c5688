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

//! VNC Hextile decoding.
//!
//! Hextile divides the rectangle into 16x16 tiles, left to right then top to
//! bottom. Each tile starts with a subencoding mask and is either raw pixels
//! or a background fill overlaid with subrectangles. Background and
//! foreground colours carry over from the previous tile when not specified.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::read_pixel;
use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::protocol::{
    Rectangle, HEXTILE_ANY_SUBRECTS, HEXTILE_BACKGROUND_SPECIFIED, HEXTILE_FOREGROUND_SPECIFIED,
    HEXTILE_RAW, HEXTILE_SUBRECTS_COLOURED,
};

const TILE_SIZE: u16 = 16;

/// Decodes a Hextile rectangle into the framebuffer.
///
/// # Errors
///
/// Returns an I/O error if the stream ends early, or a protocol error for a
/// subrectangle outside its tile.
#[allow(clippy::similar_names)] // bg and fg are standard VNC Hextile terminology
pub async fn decode<R: AsyncRead + Unpin>(
    reader: &mut R,
    rect: &Rectangle,
    framebuffer: &mut Framebuffer,
) -> Result<()> {
    let bpp = framebuffer.bytes_per_pixel();
    let mut bg = [0u8; 4];
    let mut fg = [0u8; 4];

    for tile_y in (rect.y..rect.y + rect.height).step_by(usize::from(TILE_SIZE)) {
        for tile_x in (rect.x..rect.x + rect.width).step_by(usize::from(TILE_SIZE)) {
            let tile_w = TILE_SIZE.min(rect.x + rect.width - tile_x);
            let tile_h = TILE_SIZE.min(rect.y + rect.height - tile_y);

            let subencoding = reader.read_u8().await?;

            if subencoding & HEXTILE_RAW != 0 {
                let mut pixels = vec![0u8; usize::from(tile_w) * usize::from(tile_h) * bpp];
                reader.read_exact(&mut pixels).await?;
                framebuffer.put_pixels(tile_x, tile_y, tile_w, tile_h, &pixels)?;
                continue;
            }

            if subencoding & HEXTILE_BACKGROUND_SPECIFIED != 0 {
                bg = read_pixel(reader, bpp).await?;
            }
            framebuffer.fill(tile_x, tile_y, tile_w, tile_h, &bg[..bpp])?;

            if subencoding & HEXTILE_FOREGROUND_SPECIFIED != 0 {
                fg = read_pixel(reader, bpp).await?;
            }

            if subencoding & HEXTILE_ANY_SUBRECTS == 0 {
                continue;
            }

            let count = reader.read_u8().await?;
            let coloured = subencoding & HEXTILE_SUBRECTS_COLOURED != 0;
            for _ in 0..count {
                let colour = if coloured {
                    read_pixel(reader, bpp).await?
                } else {
                    fg
                };
                let xy = reader.read_u8().await?;
                let wh = reader.read_u8().await?;

                let sx = u16::from(xy >> 4);
                let sy = u16::from(xy & 0x0f);
                let sw = u16::from(wh >> 4) + 1;
                let sh = u16::from(wh & 0x0f) + 1;

                if sx + sw > tile_w || sy + sh > tile_h {
                    return Err(VncError::Protocol(format!(
                        "hextile subrect {sw}x{sh}+{sx}+{sy} exceeds {tile_w}x{tile_h} tile"
                    )));
                }
                framebuffer.fill(tile_x + sx, tile_y + sy, sw, sh, &colour[..bpp])?;
            }
        }
    }

    Ok(())
}
