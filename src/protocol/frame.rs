//! # Command Frames
//!
//! Every command sent to a revision B panel is a fixed 10-byte frame: the
//! opcode, eight payload bytes, and the opcode again.
//!
//! ```text
//! ┌────┬────┬────┬────┬────┬────┬────┬────┬────┬────┐
//! │ op │ p0 │ p1 │ p2 │ p3 │ p4 │ p5 │ p6 │ p7 │ op │
//! └────┴────┴────┴────┴────┴────┴────┴────┴────┴────┘
//! ```
//!
//! Payloads shorter than 8 bytes are zero padded. Multi-byte integers inside
//! a payload are **big-endian**, unlike the pixel stream.

use crate::error::LuceroError;

/// Length of every command frame on the wire.
pub const FRAME_LEN: usize = 10;

/// Maximum payload carried by one frame.
pub const PAYLOAD_LEN: usize = 8;

/// A complete command frame, ready to be written to the transport.
pub type Frame = [u8; FRAME_LEN];

/// # Command Opcodes
///
/// | Command | Hex | Payload |
/// |---------|-----|---------|
/// | Hello | 0xCA | `"HELLO"` |
/// | SetOrientation | 0xCB | `[0 \| 1]` |
/// | DisplayBitmap | 0xCC | `[x0, y0, x1, y1]` as big-endian u16 |
/// | SetLighting | 0xCD | `[r, g, b]` |
/// | SetBrightness | 0xCE | `[level]` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Establish communication before driving the screen
    Hello = 0xCA,
    /// Set the screen orientation
    SetOrientation = 0xCB,
    /// Announce a bitmap region; pixel data follows as raw lines
    DisplayBitmap = 0xCC,
    /// Set the backplate RGB LED colour
    SetLighting = 0xCD,
    /// Set the screen brightness
    SetBrightness = 0xCE,
}

impl Command {
    #[inline]
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

/// # Build a Command Frame
///
/// Frames `payload` between two copies of the opcode, padding with zeros.
///
/// ## Errors
///
/// [`LuceroError::InvalidPayload`] if `payload` is longer than 8 bytes.
///
/// ## Example
///
/// ```
/// use lucero::protocol::frame::{build_frame, Command};
///
/// let frame = build_frame(Command::SetBrightness, &[0xFF])?;
/// assert_eq!(frame, [0xCE, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0xCE]);
/// # Ok::<(), lucero::LuceroError>(())
/// ```
pub fn build_frame(cmd: Command, payload: &[u8]) -> Result<Frame, LuceroError> {
    if payload.len() > PAYLOAD_LEN {
        return Err(LuceroError::InvalidPayload { len: payload.len() });
    }

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = cmd.opcode();
    frame[1..1 + payload.len()].copy_from_slice(payload);
    frame[FRAME_LEN - 1] = cmd.opcode();
    Ok(frame)
}

/// Payload for [`Command::DisplayBitmap`]: the inclusive bounding box,
/// each coordinate split big-endian.
pub fn bitmap_region(x0: u16, y0: u16, x1: u16, y1: u16) -> [u8; PAYLOAD_LEN] {
    let mut payload = [0u8; PAYLOAD_LEN];
    for (slot, value) in payload.chunks_exact_mut(2).zip([x0, y0, x1, y1]) {
        slot.copy_from_slice(&value.to_be_bytes());
    }
    payload
}

// ============================================================================
// TESTS
// ============================================================================
