//! # HELLO Handshake
//!
//! The host opens the conversation with a `HELLO` frame carrying the ASCII
//! bytes `HELLO`. The panel echoes them back in a frame of its own, followed
//! by a two-byte version that identifies its hardware sub-revision:
//!
//! ```text
//! Request:  CA 'H' 'E' 'L' 'L' 'O' 00 00 00 CA
//! Reply:    CA 'H' 'E' 'L' 'L' 'O' 0A vv 00 CA
//!                                  │  └── sub-revision (01, 02, 11, 12)
//!                                  └───── version high byte, always 0x0A
//! ```
//!
//! Parsing is best effort. Panels that answer unexpectedly are still driven
//! with the most restrictive capability assumptions, so every problem found
//! here is reported as a [`HandshakeIssue`] rather than an error.

use std::fmt;

use super::frame::{Command, FRAME_LEN};

/// Payload sent with the HELLO command and expected back in the reply.
pub const HELLO_PAYLOAD: [u8; 5] = *b"HELLO";

/// High version byte shared by all known revision B sub-revisions.
const VERSION_HIGH: u8 = 0x0A;

// ============================================================================
// SUB-REVISIONS
// ============================================================================

/// # Hardware Sub-Revision
///
/// | Sub-revision | Hardware | Brightness | RGB backplate |
/// |--------------|----------|------------|---------------|
/// | A01 | revision B | on/off | no |
/// | A02 | flagship | on/off | yes |
/// | A11 | revision B | 0-255 | no |
/// | A12 | flagship | 0-255 | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubRevision {
    #[default]
    A01,
    A02,
    A11,
    A12,
}

impl SubRevision {
    /// Map the two version bytes of a HELLO reply to a sub-revision.
    pub fn from_version(high: u8, low: u8) -> Option<Self> {
        if high != VERSION_HIGH {
            return None;
        }
        match low {
            0x01 => Some(Self::A01),
            0x02 => Some(Self::A02),
            0x11 => Some(Self::A11),
            0x12 => Some(Self::A12),
            _ => None,
        }
    }

    /// Version word as reported by the panel (e.g. `0x0A11`).
    pub fn version(self) -> u16 {
        match self {
            Self::A01 => 0x0A01,
            Self::A02 => 0x0A02,
            Self::A11 => 0x0A11,
            Self::A12 => 0x0A12,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        Capabilities {
            rgb_backlight: matches!(self, Self::A02 | Self::A12),
            brightness_range: matches!(self, Self::A11 | Self::A12),
        }
    }
}

impl fmt::Display for SubRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.version())
    }
}

/// Features offered by a panel, derived once from its sub-revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Backplate LED colour can be set ("flagship" hardware).
    pub rgb_backlight: bool,
    /// Brightness accepts 0-255 instead of on/off.
    pub brightness_range: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        SubRevision::default().capabilities()
    }
}

// ============================================================================
// REPLY PARSING
// ============================================================================

/// Something unexpected in a HELLO reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeIssue {
    /// Fewer than 10 bytes arrived before the read timed out.
    ShortResponse { len: usize },
    /// First or last byte is not the HELLO opcode.
    BadFraming,
    /// Bytes 1-5 are not the echoed `HELLO`.
    NoHello { got: Vec<u8> },
    /// Version bytes do not match a known sub-revision.
    UnknownSubRevision { high: u8, low: u8 },
}

impl fmt::Display for HandshakeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortResponse { len } => {
                write!(f, "device not recognised (short response to HELLO: {} bytes)", len)
            }
            Self::BadFraming => write!(f, "device not recognised (bad framing)"),
            Self::NoHello { got } => write!(f, "device not recognised (no HELLO; got {:02X?})", got),
            Self::UnknownSubRevision { high, low } => write!(
                f,
                "display returned unknown sub-revision {:#04x} {:#04x} on HELLO answer",
                high, low
            ),
        }
    }
}

/// Outcome of parsing a HELLO reply.
///
/// `sub_revision` is `None` when the tier could not be determined; the
/// session then keeps the default ([`SubRevision::A01`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeReport {
    pub sub_revision: Option<SubRevision>,
    pub issues: Vec<HandshakeIssue>,
}

impl HandshakeReport {
    /// True if the reply was well formed and named a known sub-revision.
    pub fn is_recognized(&self) -> bool {
        self.sub_revision.is_some() && self.issues.is_empty()
    }

    /// The sub-revision to run with, falling back to the default.
    pub fn effective(&self) -> SubRevision {
        self.sub_revision.unwrap_or_default()
    }
}

/// Parse a HELLO reply.
///
/// Each check is independent: a reply with bad framing but valid version
/// bytes still yields a sub-revision, matching how the panels behave in
/// practice.
pub fn parse_reply(reply: &[u8]) -> HandshakeReport {
    let mut report = HandshakeReport::default();
    let opcode = Command::Hello.opcode();

    if reply.len() != FRAME_LEN {
        report.issues.push(HandshakeIssue::ShortResponse { len: reply.len() });
    }

    if reply.first() != Some(&opcode) || reply.last() != Some(&opcode) {
        report.issues.push(HandshakeIssue::BadFraming);
    }

    let echoed = reply.get(1..6).unwrap_or_else(|| reply.get(1..).unwrap_or(&[]));
    if echoed != HELLO_PAYLOAD {
        report.issues.push(HandshakeIssue::NoHello {
            got: echoed.to_vec(),
        });
    }

    if let (Some(&high), Some(&low)) = (reply.get(6), reply.get(7)) {
        if high == VERSION_HIGH {
            match SubRevision::from_version(high, low) {
                Some(sub_revision) => report.sub_revision = Some(sub_revision),
                None => report
                    .issues
                    .push(HandshakeIssue::UnknownSubRevision { high, low }),
            }
        }
    }

    report
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(high: u8, low: u8) -> Vec<u8> {
        vec![0xCA, b'H', b'E', b'L', b'L', b'O', high, low, 0x00, 0xCA]
    }

    #[test]
    fn test_known_sub_revisions() {
        for (low, expected) in [
            (0x01, SubRevision::A01),
            (0x02, SubRevision::A02),
            (0x11, SubRevision::A11),
            (0x12, SubRevision::A12),
        ] {
            let report = parse_reply(&reply(0x0A, low));
            assert_eq!(report.sub_revision, Some(expected));
            assert!(report.is_recognized());
        }
    }

    #[test]
    fn test_capabilities() {
        let caps = |s: SubRevision| s.capabilities();
        assert_eq!(
            caps(SubRevision::A01),
            Capabilities { rgb_backlight: false, brightness_range: false }
        );
        assert_eq!(
            caps(SubRevision::A02),
            Capabilities { rgb_backlight: true, brightness_range: false }
        );
        assert_eq!(
            caps(SubRevision::A11),
            Capabilities { rgb_backlight: false, brightness_range: true }
        );
        assert_eq!(
            caps(SubRevision::A12),
            Capabilities { rgb_backlight: true, brightness_range: true }
        );
    }

    #[test]
    fn test_default_is_most_restrictive() {
        assert_eq!(SubRevision::default(), SubRevision::A01);
        assert_eq!(
            Capabilities::default(),
            Capabilities { rgb_backlight: false, brightness_range: false }
        );
    }

    #[test]
    fn test_unknown_sub_revision() {
        let report = parse_reply(&reply(0x0A, 0x33));
        assert_eq!(report.sub_revision, None);
        assert_eq!(
            report.issues,
            vec![HandshakeIssue::UnknownSubRevision { high: 0x0A, low: 0x33 }]
        );
        assert_eq!(report.effective(), SubRevision::A01);
    }

    #[test]
    fn test_other_version_high_byte_is_ignored() {
        let report = parse_reply(&reply(0x0B, 0x11));
        assert_eq!(report.sub_revision, None);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_short_response() {
        let report = parse_reply(&[0xCA, b'H', b'E', b'L', b'L']);
        assert_eq!(report.sub_revision, None);
        assert_eq!(report.issues[0], HandshakeIssue::ShortResponse { len: 5 });
        assert_eq!(report.effective(), SubRevision::A01);
    }

    #[test]
    fn test_empty_response() {
        let report = parse_reply(&[]);
        assert_eq!(
            report.issues,
            vec![
                HandshakeIssue::ShortResponse { len: 0 },
                HandshakeIssue::BadFraming,
                HandshakeIssue::NoHello { got: vec![] },
            ]
        );
    }

    #[test]
    fn test_bad_framing_still_reads_version() {
        let mut data = reply(0x0A, 0x12);
        data[9] = 0x00;
        let report = parse_reply(&data);
        assert_eq!(report.issues, vec![HandshakeIssue::BadFraming]);
        assert_eq!(report.sub_revision, Some(SubRevision::A12));
        assert!(!report.is_recognized());
    }

    #[test]
    fn test_no_hello_echo() {
        let mut data = reply(0x0A, 0x01);
        data[1..6].copy_from_slice(b"WORLD");
        let report = parse_reply(&data);
        assert_eq!(
            report.issues,
            vec![HandshakeIssue::NoHello { got: b"WORLD".to_vec() }]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SubRevision::A11.to_string(), "0x0a11");
    }
}
