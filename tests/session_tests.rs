//! # Session Tests
//!
//! Drive a [`DeviceSession`] over a [`MemoryTransport`] and check the exact
//! bytes that reach the wire.

use image::{Rgb, RgbImage};
use lucero::protocol::handshake::{HandshakeIssue, SubRevision};
use lucero::{DeviceSession, DisplayConfig, LuceroError, MemoryTransport, Orientation};
use pretty_assertions::assert_eq;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const HELLO_REQUEST: [u8; 10] = [0xCA, b'H', b'E', b'L', b'L', b'O', 0, 0, 0, 0xCA];

/// HELLO reply for sub-revision `0x0A<low>`.
fn reply(low: u8) -> Vec<u8> {
    vec![0xCA, b'H', b'E', b'L', b'L', b'O', 0x0A, low, 0x00, 0xCA]
}

fn frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; 10];
    frame[0] = opcode;
    frame[1..1 + payload.len()].copy_from_slice(payload);
    frame[9] = opcode;
    frame
}

/// A ready session on a small 4x2 display, with the HELLO write discarded.
fn small_session(low: u8) -> (DeviceSession<MemoryTransport>, MemoryTransport) {
    let config = DisplayConfig {
        width: 4,
        height: 2,
        ..DisplayConfig::default()
    };
    session_with(config, low)
}

fn session_with(config: DisplayConfig, low: u8) -> (DeviceSession<MemoryTransport>, MemoryTransport) {
    let transport = MemoryTransport::with_reply(&reply(low));
    let (session, report) = DeviceSession::connect(transport.clone(), config).unwrap();
    assert!(report.is_recognized());
    transport.clear_writes();
    (session, transport)
}

// ============================================================================
// HANDSHAKE
// ============================================================================

#[test]
fn test_hello_detects_brightness_range_tier() {
    let transport = MemoryTransport::with_reply(&reply(0x11));
    let mut session = DeviceSession::new(transport.clone(), DisplayConfig::default()).unwrap();

    assert!(!session.is_ready());
    let report = session.hello().unwrap();

    assert_eq!(report.sub_revision, Some(SubRevision::A11));
    assert_eq!(session.sub_revision(), Some(SubRevision::A11));
    assert_eq!(transport.writes(), vec![HELLO_REQUEST.to_vec()]);
}

#[test]
fn test_hello_short_reply_keeps_default() {
    let transport = MemoryTransport::with_reply(&[0xCA, b'H', b'E', b'L', b'L']);
    let mut session = DeviceSession::new(transport, DisplayConfig::default()).unwrap();

    let report = session.hello().unwrap();

    assert_eq!(report.sub_revision, None);
    assert_eq!(report.issues[0], HandshakeIssue::ShortResponse { len: 5 });
    assert!(session.is_ready());
    assert_eq!(session.sub_revision(), Some(SubRevision::A01));
}

#[test]
fn test_hello_no_reply_degrades() {
    let mut session = DeviceSession::new(MemoryTransport::new(), DisplayConfig::default()).unwrap();
    let report = session.hello().unwrap();
    assert!(!report.is_recognized());
    assert_eq!(session.sub_revision(), Some(SubRevision::A01));
}

#[test]
fn test_hello_only_once() {
    let (mut session, transport) = small_session(0x12);
    assert!(matches!(session.hello(), Err(LuceroError::AlreadyEstablished)));
    assert_eq!(session.sub_revision(), Some(SubRevision::A12));
    session.flush();
    assert!(transport.writes().is_empty());
}

#[test]
fn test_operations_require_handshake() {
    let transport = MemoryTransport::new();
    let session = DeviceSession::new(transport.clone(), DisplayConfig::default()).unwrap();

    assert!(matches!(session.set_brightness(50), Err(LuceroError::NotReady)));
    assert!(matches!(
        session.set_orientation(Orientation::Landscape),
        Err(LuceroError::NotReady)
    ));
    assert!(matches!(session.clear(), Err(LuceroError::NotReady)));
    session.flush();
    assert!(transport.writes().is_empty());
}

#[test]
fn test_invalid_config_rejected() {
    let config = DisplayConfig {
        width: 0,
        ..DisplayConfig::default()
    };
    assert!(matches!(
        DeviceSession::new(MemoryTransport::new(), config),
        Err(LuceroError::Config(_))
    ));
}

// ============================================================================
// COMMANDS
// ============================================================================

#[test]
fn test_brightness_on_range_tier() {
    let (session, transport) = small_session(0x11);
    session.set_brightness(100).unwrap();
    session.set_brightness(50).unwrap();
    session.set_brightness(0).unwrap();
    session.flush();

    assert_eq!(
        transport.writes(),
        vec![frame(0xCE, &[255]), frame(0xCE, &[127]), frame(0xCE, &[0])]
    );
}

#[test]
fn test_brightness_on_binary_tier() {
    let (session, transport) = small_session(0x01);
    session.set_brightness(0).unwrap();
    session.set_brightness(1).unwrap();
    session.set_brightness(100).unwrap();
    session.flush();

    assert_eq!(
        transport.writes(),
        vec![frame(0xCE, &[1]), frame(0xCE, &[0]), frame(0xCE, &[0])]
    );
}

#[test]
fn test_brightness_out_of_range_sends_nothing() {
    let (session, transport) = small_session(0x11);
    assert!(matches!(
        session.set_brightness(101),
        Err(LuceroError::InvalidArgument(_))
    ));
    session.flush();
    assert!(transport.writes().is_empty());
}

#[test]
fn test_screen_on_off() {
    let config = DisplayConfig {
        width: 4,
        height: 2,
        brightness: 40,
        ..DisplayConfig::default()
    };
    let (session, transport) = session_with(config, 0x12);
    session.screen_off().unwrap();
    session.screen_on().unwrap();
    session.flush();

    assert_eq!(
        transport.writes(),
        vec![frame(0xCE, &[0]), frame(0xCE, &[102])]
    );
}

#[test]
fn test_backplate_color_flagship() {
    let (session, transport) = small_session(0x02);
    session.set_backplate_color(Rgb([255, 0, 128])).unwrap();
    session.flush();
    assert_eq!(transport.writes(), vec![frame(0xCD, &[255, 0, 128])]);
}

#[test]
fn test_backplate_color_unsupported_is_noop() {
    for low in [0x01, 0x11] {
        let (session, transport) = small_session(low);
        session.set_backplate_color(Rgb([255, 0, 128])).unwrap();
        session.flush();
        assert!(transport.writes().is_empty());
    }
}

#[test]
fn test_orientation() {
    let (session, transport) = small_session(0x01);
    for o in [
        Orientation::Portrait,
        Orientation::Landscape,
        Orientation::ReversePortrait,
        Orientation::ReverseLandscape,
    ] {
        session.set_orientation(o).unwrap();
    }
    session.flush();

    assert_eq!(
        transport.writes(),
        vec![
            frame(0xCB, &[0]),
            frame(0xCB, &[1]),
            frame(0xCB, &[0]),
            frame(0xCB, &[1]),
        ]
    );
}

#[test]
fn test_apply_defaults() {
    let config = DisplayConfig {
        width: 4,
        height: 2,
        brightness: 100,
        backplate_color: [1, 2, 3],
        orientation: Orientation::Landscape,
        ..DisplayConfig::default()
    };
    let (session, transport) = session_with(config, 0x12);
    session.apply_defaults().unwrap();
    session.flush();

    assert_eq!(
        transport.writes(),
        vec![frame(0xCB, &[1]), frame(0xCE, &[255]), frame(0xCD, &[1, 2, 3])]
    );
}

// ============================================================================
// BITMAPS
// ============================================================================

#[test]
fn test_clear_paints_white_screen() {
    let (session, transport) = small_session(0x01);
    session.clear().unwrap();
    session.flush();

    // 4x2 display: one 32-byte line chunk holds all 16 bytes of pixels
    assert_eq!(
        transport.writes(),
        vec![frame(0xCC, &[0, 0, 0, 0, 0, 3, 0, 1]), vec![0xFF; 16]]
    );
}

#[test]
fn test_reset_is_clear() {
    let (session, transport) = small_session(0x01);
    session.reset().unwrap();
    session.flush();
    assert_eq!(transport.writes()[0], frame(0xCC, &[0, 0, 0, 0, 0, 3, 0, 1]));
}

#[test]
fn test_bitmap_native_size_bounding_box() {
    let (session, transport) = session_with(DisplayConfig::default(), 0x11);
    let image = RgbImage::from_pixel(300, 2, Rgb([255, 0, 0]));
    session.display_bitmap(&image, 0, 0, 0, 0).unwrap();
    session.flush();

    let writes = transport.writes();
    // x1 = 299 = 0x012B, y1 = 1
    assert_eq!(writes[0], frame(0xCC, &[0, 0, 0, 0, 0x01, 0x2B, 0x00, 0x01]));
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1].len(), 300 * 2 * 2);
    assert!(writes[1].chunks(2).all(|p| p == [0xF8, 0x00]));
}

#[test]
fn test_bitmap_lines_chunked_at_eight_rows() {
    let (session, transport) = session_with(DisplayConfig::default(), 0x11);
    // 320 wide: a line is 8 * 320 = 2560 bytes (4 rows); 18 rows = 4 full + 1 partial
    let image = RgbImage::new(320, 18);
    session.display_bitmap(&image, 0, 0, 0, 0).unwrap();
    session.flush();

    let lengths: Vec<usize> = transport.writes().iter().map(Vec::len).collect();
    assert_eq!(lengths, vec![10, 2560, 2560, 2560, 2560, 1280]);
}

#[test]
fn test_bitmap_offset_and_crop() {
    let (session, transport) = small_session(0x11);
    let mut image = RgbImage::new(3, 2);
    image.put_pixel(0, 0, Rgb([0, 0, 255]));
    image.put_pixel(1, 0, Rgb([255, 255, 255]));
    image.put_pixel(2, 1, Rgb([255, 0, 0]));

    session.display_bitmap(&image, 1, 1, 2, 1).unwrap();
    session.flush();

    assert_eq!(
        transport.writes(),
        vec![
            frame(0xCC, &[0, 1, 0, 1, 0, 2, 0, 1]),
            vec![0x00, 0x1F, 0xFF, 0xFF],
        ]
    );
}

#[test]
fn test_bitmap_rejects_x_beyond_display() {
    let (session, transport) = small_session(0x11);
    let image = RgbImage::new(2, 2);
    assert!(matches!(
        session.display_bitmap(&image, 5, 0, 0, 0),
        Err(LuceroError::InvalidArgument(_))
    ));
    session.flush();
    assert!(transport.writes().is_empty());
}

#[test]
fn test_bitmap_rejects_region_larger_than_image() {
    let (session, transport) = small_session(0x11);
    let image = RgbImage::new(2, 2);
    assert!(matches!(
        session.display_bitmap(&image, 0, 0, 3, 0),
        Err(LuceroError::InvalidArgument(_))
    ));
    session.flush();
    assert!(transport.writes().is_empty());
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn test_bitmap_then_brightness_not_interleaved() {
    let (session, transport) = session_with(DisplayConfig::default(), 0x11);
    transport.set_write_delay(std::time::Duration::from_millis(1));

    let image = RgbImage::new(320, 40);
    session.display_bitmap(&image, 0, 0, 0, 0).unwrap();
    session.set_brightness(100).unwrap();
    session.flush();

    let writes = transport.writes();
    // frame + 10 lines, then brightness
    assert_eq!(writes.len(), 12);
    assert_eq!(writes[0][0], 0xCC);
    assert!(writes[1..11].iter().all(|w| w.len() == 2560));
    assert_eq!(writes[11], frame(0xCE, &[255]));
}

#[test]
fn test_concurrent_producers_keep_bitmaps_contiguous() {
    let (session, transport) = session_with(DisplayConfig::default(), 0x11);
    transport.set_write_delay(std::time::Duration::from_micros(100));
    let image = RgbImage::from_pixel(320, 24, Rgb([255, 255, 255]));

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..5 {
                session.display_bitmap(&image, 0, 0, 0, 0).unwrap();
            }
        });
        scope.spawn(|| {
            for level in 0..20 {
                session.set_brightness(level).unwrap();
            }
        });
    });
    session.flush();

    let writes = transport.writes();
    assert_eq!(writes.len(), 5 * 7 + 20);
    let mut i = 0;
    while i < writes.len() {
        if writes[i][0] == 0xCC && writes[i].len() == 10 {
            // 24 rows = 6 lines, all immediately after the frame
            assert!(writes[i + 1..i + 7].iter().all(|w| w.len() == 2560));
            i += 7;
        } else {
            assert_eq!(writes[i][0], 0xCE);
            i += 1;
        }
    }
}

#[test]
fn test_congested_write_is_dropped_and_session_continues() {
    let (session, transport) = small_session(0x11);
    transport.fail_next_writes(1);

    session.set_brightness(100).unwrap();
    session.set_brightness(0).unwrap();
    session.flush();

    assert_eq!(transport.writes(), vec![frame(0xCE, &[0])]);
}

#[test]
fn test_drop_flushes_pending_writes() {
    let (session, transport) = small_session(0x11);
    transport.set_write_delay(std::time::Duration::from_millis(2));
    for _ in 0..5 {
        session.set_brightness(100).unwrap();
    }
    drop(session);

    assert_eq!(transport.writes().len(), 5);
}
