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

//! VNC Raw encoding.
//!
//! The simplest encoding: `width * height` pixels in the negotiated pixel
//! format, row by row, without compression.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::protocol::Rectangle;

/// Reads a Raw rectangle into the framebuffer.
///
/// # Errors
///
/// Returns an I/O error if the stream ends early.
pub async fn decode<R: AsyncRead + Unpin>(
    reader: &mut R,
    rect: &Rectangle,
    framebuffer: &mut Framebuffer,
) -> Result<()> {
    let mut pixels = vec![0u8; rect.area() * framebuffer.bytes_per_pixel()];
    reader.read_exact(&mut pixels).await?;
    framebuffer.put_pixels(rect.x, rect.y, rect.width, rect.height, &pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PixelFormat, ENCODING_RAW};

    #[tokio::test]
    async fn test_raw_rect() {
        let mut fb = Framebuffer::new(3, 2, PixelFormat::rgb888());
        let rect = Rectangle {
            x: 1,
            y: 0,
            width: 2,
            height: 2,
            encoding: ENCODING_RAW,
        };
        // BB GG RR 00 per pixel
        let payload: Vec<u8> = [[1, 2, 3, 0], [4, 5, 6, 0], [7, 8, 9, 0], [10, 11, 12, 0]]
            .concat();
        let mut reader = &payload[..];
        decode(&mut reader, &rect, &mut fb).await.unwrap();

        let image = fb.snapshot();
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(1, 0), Some([3, 2, 1, 255]));
        assert_eq!(image.pixel(2, 1), Some([12, 11, 10, 255]));
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let mut fb = Framebuffer::new(2, 2, PixelFormat::rgb888());
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            encoding: ENCODING_RAW,
        };
        let mut reader: &[u8] = &[0; 5];
        assert!(decode(&mut reader, &rect, &mut fb).await.is_err());
    }
}
