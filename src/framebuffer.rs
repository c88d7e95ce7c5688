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

//! Client-side framebuffer storage.
//!
//! Pixels are stored exactly as they arrive on the wire, in the negotiated
//! [`PixelFormat`]. Decoders write rectangles into the buffer; callers only
//! ever see converted [`RgbaImage`] snapshots.

use crate::error::{Result, VncError};
use crate::protocol::PixelFormat;
use crate::translate;

/// The remote screen as last reported by the server.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Framebuffer {
    /// Creates a black framebuffer.
    #[must_use]
    pub fn new(width: u16, height: u16, format: PixelFormat) -> Self {
        let len = usize::from(width) * usize::from(height) * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; len],
        }
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Raw pixel bytes in [`Self::format`].
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per pixel in the stored format.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// Reallocates for a new desktop size. Contents are cleared.
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height, self.format.clone());
    }

    /// Fails unless the rectangle lies entirely inside the framebuffer.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Protocol`] for out-of-bounds rectangles.
    pub fn check_bounds(&self, x: u16, y: u16, width: u16, height: u16) -> Result<()> {
        let fits_x = u32::from(x) + u32::from(width) <= u32::from(self.width);
        let fits_y = u32::from(y) + u32::from(height) <= u32::from(self.height);
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(VncError::Protocol(format!(
                "rectangle {width}x{height}+{x}+{y} exceeds framebuffer {}x{}",
                self.width, self.height
            )))
        }
    }

    fn offset(&self, x: u16, y: u16) -> usize {
        (usize::from(y) * usize::from(self.width) + usize::from(x)) * self.bytes_per_pixel()
    }

    /// Writes a row-major block of pixels.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Protocol`] if the rectangle is out of bounds or
    /// `pixels` has the wrong length.
    pub fn put_pixels(&mut self, x: u16, y: u16, width: u16, height: u16, pixels: &[u8]) -> Result<()> {
        self.check_bounds(x, y, width, height)?;
        let row_bytes = usize::from(width) * self.bytes_per_pixel();
        if pixels.len() != row_bytes * usize::from(height) {
            return Err(VncError::Protocol(format!(
                "expected {} bytes of pixel data, got {}",
                row_bytes * usize::from(height),
                pixels.len()
            )));
        }
        if row_bytes == 0 {
            return Ok(());
        }

        for (row, src) in pixels.chunks_exact(row_bytes).enumerate() {
            let start = self.offset(x, y + row as u16);
            self.data[start..start + row_bytes].copy_from_slice(src);
        }
        Ok(())
    }

    /// Fills a rectangle with one pixel value.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Protocol`] if the rectangle is out of bounds.
    pub fn fill(&mut self, x: u16, y: u16, width: u16, height: u16, pixel: &[u8]) -> Result<()> {
        self.check_bounds(x, y, width, height)?;
        let bpp = self.bytes_per_pixel();
        if pixel.len() != bpp {
            return Err(VncError::Protocol(format!(
                "fill pixel is {} bytes, expected {bpp}",
                pixel.len()
            )));
        }

        for row in y..y + height {
            let start = self.offset(x, row);
            for dst in self.data[start..start + usize::from(width) * bpp].chunks_exact_mut(bpp) {
                dst.copy_from_slice(pixel);
            }
        }
        Ok(())
    }

    /// Copies a rectangle from `(src_x, src_y)` to `(x, y)`.
    ///
    /// Source and destination may overlap; the source is read in full before
    /// anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Protocol`] if either rectangle is out of bounds.
    pub fn copy_rect(
        &mut self,
        src_x: u16,
        src_y: u16,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<()> {
        self.check_bounds(src_x, src_y, width, height)?;
        self.check_bounds(x, y, width, height)?;

        let row_bytes = usize::from(width) * self.bytes_per_pixel();
        let mut temp = Vec::with_capacity(row_bytes * usize::from(height));
        for row in src_y..src_y + height {
            let start = self.offset(src_x, row);
            temp.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        self.put_pixels(x, y, width, height, &temp)
    }

    /// Converts the whole framebuffer to RGBA.
    #[must_use]
    pub fn snapshot(&self) -> RgbaImage {
        RgbaImage {
            width: self.width,
            height: self.height,
            data: translate::to_rgba(&self.data, &self.format),
        }
    }
}

/// An RGBA screenshot: 4 bytes per pixel, rows top to bottom, alpha 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl RgbaImage {
    /// RGBA value at `(x, y)`, if inside the image.
    #[must_use]
    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (usize::from(y) * usize::from(self.width) + usize::from(x)) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[at..at + 4]);
        Some(px)
    }

    /// Encodes the image as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Image`] if encoding fails.
    #[cfg(feature = "png")]
    pub fn to_png(&self) -> Result<Vec<u8>> {
        use image::ImageEncoder;

        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out).write_image(
            &self.data,
            u32::from(self.width),
            u32::from(self.height),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(out)
    }

    /// Encodes the image as a `data:image/png;base64,` URI.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::Image`] if PNG encoding fails.
    #[cfg(feature = "png")]
    pub fn to_data_uri(&self) -> Result<String> {
        use base64::Engine;

        let png = self.to_png()?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }
}
