//! # Revision B Panel Protocol
//!
//! This module provides the low-level wire encoding for revision B smart
//! LCD panels.
//!
//! ## Module Structure
//!
//! - [`frame`]: Command opcodes and 10-byte frame builder
//! - [`handshake`]: HELLO reply parsing and hardware sub-revisions
//! - [`pixel`]: RGB888 to packed 16-bit pixel encoding
//!
//! ## Usage Example
//!
//! ```
//! use image::Rgb;
//! use lucero::protocol::{frame, pixel};
//!
//! // Announce a 2x1 bitmap at the top-left corner
//! let region = frame::bitmap_region(0, 0, 1, 0);
//! let header = frame::build_frame(frame::Command::DisplayBitmap, &region)?;
//! assert_eq!(header[0], 0xCC);
//!
//! // Followed by the pixel data
//! let mut data = Vec::new();
//! data.extend(pixel::encode_le(Rgb([255, 255, 255])));
//! data.extend(pixel::encode_le(Rgb([0, 0, 0])));
//! assert_eq!(data, vec![0xFF, 0xFF, 0x00, 0x00]);
//! # Ok::<(), lucero::LuceroError>(())
//! ```

pub mod frame;
pub mod handshake;
pub mod pixel;
