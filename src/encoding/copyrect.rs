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

//! VNC CopyRect encoding.
//!
//! The payload is the source position (two u16 values); the rectangle is
//! copied from there within the client's own framebuffer.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::protocol::Rectangle;

/// Applies a CopyRect rectangle.
///
/// # Errors
///
/// Returns an I/O error if the stream ends early, or a protocol error if the
/// source lies outside the framebuffer.
pub async fn decode<R: AsyncRead + Unpin>(
    reader: &mut R,
    rect: &Rectangle,
    framebuffer: &mut Framebuffer,
) -> Result<()> {
    let src_x = reader.read_u16().await?;
    let src_y = reader.read_u16().await?;
    framebuffer.copy_rect(src_x, src_y, rect.x, rect.y, rect.width, rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PixelFormat, ENCODING_COPYRECT};
    use crate::translate::pack_pixel;

    #[tokio::test]
    async fn test_copy_down_overlapping() {
        let mut fb = Framebuffer::new(1, 4, PixelFormat::rgb888());
        for y in 0..4u8 {
            let px = pack_pixel(y * 10, 0, 0, fb.format());
            fb.fill(0, u16::from(y), 1, 1, &px).unwrap();
        }
        let rect = Rectangle {
            x: 0,
            y: 1,
            width: 1,
            height: 3,
            encoding: ENCODING_COPYRECT,
        };
        let mut reader: &[u8] = &[0, 0, 0, 0];
        decode(&mut reader, &rect, &mut fb).await.unwrap();

        let image = fb.snapshot();
        let reds: Vec<u8> = (0..4).map(|y| image.pixel(0, y).unwrap()[0]).collect();
        assert_eq!(reds, vec![0, 0, 10, 20]);
    }

    #[tokio::test]
    async fn test_source_out_of_bounds() {
        let mut fb = Framebuffer::new(4, 4, PixelFormat::rgb888());
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            encoding: ENCODING_COPYRECT,
        };
        let mut reader: &[u8] = &[0, 3, 0, 0];
        assert!(decode(&mut reader, &rect, &mut fb).await.is_err());
    }
}
