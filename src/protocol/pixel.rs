//! # Pixel Encoding
//!
//! Revision B panels take 16 bits per pixel, but not in the usual RGB565
//! order. Channels are first reduced to 5/6/5 bits, then packed as:
//!
//! ```text
//! Standard RGB565:  RRRRRGGG GGGBBBBB
//!                   fedcba98 76543210
//!
//! Revision B:       gggBBBBB RRRRRGGG
//!                   fedcba98 76543210
//!
//!   b0-b2   high 3 bits of green
//!   b3-b7   red (5 bits)
//!   b8-b12  blue (5 bits)
//!   b13-b15 low 3 bits of green
//! ```
//!
//! Words go on the wire little-endian (low byte first). Getting any of this
//! wrong shows up as swapped colour channels on the panel.

use image::{Rgb, RgbImage};

/// Bytes per encoded pixel.
pub const BYTES_PER_PIXEL: usize = 2;

/// Encode one RGB888 pixel into the panel's packed 16-bit word.
///
/// ## Example
///
/// ```
/// use image::Rgb;
/// use lucero::protocol::pixel::encode;
///
/// assert_eq!(encode(Rgb([255, 255, 255])), 0xFFFF);
/// assert_eq!(encode(Rgb([0, 0, 0])), 0x0000);
/// assert_eq!(encode(Rgb([255, 0, 0])), 0x00F8);
/// ```
#[inline]
pub const fn encode(pixel: Rgb<u8>) -> u16 {
    let [r, g, b] = pixel.0;
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;

    (b5 << 8) | (g6 >> 3) | ((g6 & 0x7) << 13) | (r5 << 3)
}

/// Encode one pixel straight to its wire bytes.
#[inline]
pub const fn encode_le(pixel: Rgb<u8>) -> [u8; BYTES_PER_PIXEL] {
    encode(pixel).to_le_bytes()
}

/// Encode the top-left `width` x `height` region of `image` in raster order
/// (rows top to bottom, columns left to right).
///
/// The caller guarantees the region lies inside the image.
pub fn encode_region(image: &RgbImage, width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for y in 0..height {
        for x in 0..width {
            out.extend_from_slice(&encode_le(*image.get_pixel(x, y)));
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
