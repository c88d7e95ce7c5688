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

//! Pixel format translation from the negotiated server format to RGBA.
//!
//! Framebuffer bytes are kept in the wire pixel format and only converted
//! when a snapshot is taken. Conversion reads each pixel as an integer of
//! `bits_per_pixel` width in the format's byte order, masks each component
//! with its shift and max, and scales it to 8 bits. Alpha is always 255.
//!
//! # Supported Formats
//!
//! - **32bpp**: any shift combination, either byte order
//! - **24bpp**: packed three-byte pixels
//! - **16bpp**: RGB565, RGB555 and friends
//! - **8bpp**: BGR233 and similar true-colour layouts

use crate::protocol::PixelFormat;

/// Converts a buffer of pixels in `format` into tightly packed RGBA.
///
/// Trailing bytes that do not form a whole pixel are ignored.
#[must_use]
pub fn to_rgba(src: &[u8], format: &PixelFormat) -> Vec<u8> {
    let bpp = format.bytes_per_pixel().max(1);
    let mut dst = Vec::with_capacity(src.len() / bpp * 4);

    for pixel in src.chunks_exact(bpp) {
        let (r, g, b) = extract_rgb(pixel, format);
        dst.extend_from_slice(&[r, g, b, 255]);
    }

    dst
}

/// Reads one pixel as an integer in the format's byte order.
#[inline]
pub(crate) fn pixel_value(pixel: &[u8], format: &PixelFormat) -> u32 {
    let big_endian = format.big_endian_flag != 0;
    match format.bits_per_pixel {
        16 if big_endian => u32::from(u16::from_be_bytes([pixel[0], pixel[1]])),
        16 => u32::from(u16::from_le_bytes([pixel[0], pixel[1]])),
        24 if big_endian => {
            u32::from(pixel[0]) << 16 | u32::from(pixel[1]) << 8 | u32::from(pixel[2])
        }
        24 => u32::from(pixel[2]) << 16 | u32::from(pixel[1]) << 8 | u32::from(pixel[0]),
        32 if big_endian => u32::from_be_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]),
        32 => u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]),
        _ => u32::from(pixel[0]),
    }
}

/// Extracts RGB components from a pixel in the given format.
///
/// # Returns
///
/// A tuple `(r, g, b)` with each component scaled to 0-255.
#[must_use]
pub fn extract_rgb(pixel: &[u8], format: &PixelFormat) -> (u8, u8, u8) {
    let value = pixel_value(pixel, format);

    let r_raw = value.checked_shr(u32::from(format.red_shift)).unwrap_or(0) & u32::from(format.red_max);
    let g_raw =
        value.checked_shr(u32::from(format.green_shift)).unwrap_or(0) & u32::from(format.green_max);
    let b_raw =
        value.checked_shr(u32::from(format.blue_shift)).unwrap_or(0) & u32::from(format.blue_max);

    (
        scale_component(r_raw, format.red_max),
        scale_component(g_raw, format.green_max),
        scale_component(b_raw, format.blue_max),
    )
}

/// Packs 8-bit RGB components into one pixel of `format`.
///
/// The inverse of [`extract_rgb`]; used to synthesize server-side pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Truncation to the pixel width is the point
pub fn pack_pixel(r: u8, g: u8, b: u8, format: &PixelFormat) -> Vec<u8> {
    let value = (u32::from(downscale_component(r, format.red_max)) << format.red_shift)
        | (u32::from(downscale_component(g, format.green_max)) << format.green_shift)
        | (u32::from(downscale_component(b, format.blue_max)) << format.blue_shift);

    let big_endian = format.big_endian_flag != 0;
    match format.bits_per_pixel {
        16 if big_endian => (value as u16).to_be_bytes().to_vec(),
        16 => (value as u16).to_le_bytes().to_vec(),
        24 if big_endian => vec![(value >> 16) as u8, (value >> 8) as u8, value as u8],
        24 => vec![value as u8, (value >> 8) as u8, (value >> 16) as u8],
        32 if big_endian => value.to_be_bytes().to_vec(),
        32 => value.to_le_bytes().to_vec(),
        _ => vec![value as u8],
    }
}

/// Scales a color component from its format-specific range to 8-bit (0-255).
#[inline]
#[allow(clippy::cast_possible_truncation)] // Result is at most 255
fn scale_component(value: u32, max: u16) -> u8 {
    if max == 0 {
        return 0;
    }
    if max == 255 {
        return value as u8;
    }

    // Use 64-bit to avoid overflow
    ((u64::from(value) * 255) / u64::from(max)) as u8
}

/// Downscales a color component from 8-bit (0-255) to the format-specific range.
#[inline]
#[allow(clippy::cast_possible_truncation)] // Result is at most max
fn downscale_component(value: u8, max: u16) -> u16 {
    if max == 0 {
        return 0;
    }
    if max == 255 {
        return u16::from(value);
    }

    ((u32::from(value) * u32::from(max)) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb888_little_endian() {
        // 0x00RRGGBB stored little-endian
        let src = [0x30u8, 0x20, 0x10, 0x00, 0xff, 0xff, 0xff, 0x00];
        let rgba = to_rgba(&src, &PixelFormat::rgb888());
        assert_eq!(rgba, vec![0x10, 0x20, 0x30, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_big_endian_flag_honoured() {
        let format = PixelFormat {
            big_endian_flag: 1,
            ..PixelFormat::rgb888()
        };
        let src = [0x00u8, 0x10, 0x20, 0x30];
        assert_eq!(to_rgba(&src, &format), vec![0x10, 0x20, 0x30, 255]);
    }

    #[test]
    fn test_alpha_forced_opaque() {
        // High byte set in the padding position
        let src = [0x01u8, 0x02, 0x03, 0x7f];
        let rgba = to_rgba(&src, &PixelFormat::rgb888());
        assert_eq!(rgba[3], 255);
    }

    #[test]
    fn test_rgb565_pure_red() {
        let format = PixelFormat::rgb565();
        let src = 0xF800u16.to_le_bytes();
        assert_eq!(to_rgba(&src, &format), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_extract_rgb_red_in_low_byte() {
        let format = PixelFormat {
            red_shift: 0,
            green_shift: 8,
            blue_shift: 16,
            ..PixelFormat::rgb888()
        };
        let pixel = [128u8, 64, 32, 0]; // R=128, G=64, B=32 in RGBA32

        let (r, g, b) = extract_rgb(&pixel, &format);
        assert_eq!(r, 128);
        assert_eq!(g, 64);
        assert_eq!(b, 32);
    }

    #[test]
    fn test_pack_then_extract_24bpp() {
        let format = PixelFormat {
            bits_per_pixel: 24,
            ..PixelFormat::rgb888()
        };
        let pixel = pack_pixel(200, 100, 50, &format);
        assert_eq!(pixel.len(), 3);
        assert_eq!(extract_rgb(&pixel, &format), (200, 100, 50));
    }

    #[test]
    fn test_scale_component() {
        // 5-bit (0-31) to 8-bit (0-255)
        assert_eq!(scale_component(0, 31), 0);
        assert_eq!(scale_component(31, 31), 255);
        assert_eq!(scale_component(15, 31), 123); // 15 * 255 / 31 = 123.387... = 123

        // Identity: 8-bit to 8-bit
        assert_eq!(scale_component(128, 255), 128);
    }

    #[test]
    fn test_downscale_component() {
        assert_eq!(downscale_component(0, 31), 0);
        assert_eq!(downscale_component(255, 31), 31);
        assert_eq!(downscale_component(128, 31), 15);
        assert_eq!(downscale_component(128, 255), 128);
    }
}
