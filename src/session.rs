//! # Device Session
//!
//! A [`DeviceSession`] drives one open panel. It starts `Unestablished`;
//! the HELLO handshake discovers the panel's sub-revision and moves it to
//! `Ready`, after which the display operations are available.
//!
//! ```text
//! Unestablished ──hello()──► Ready(sub-revision)
//! ```
//!
//! Every operation except `hello` returns as soon as its frames are queued
//! on the [`WriteDispatcher`]; transmission happens on the dispatcher thread.
//!
//! ## Operations
//!
//! | Operation | Wire traffic |
//! |-----------|--------------|
//! | `hello` | HELLO frame written directly, 10-byte reply read |
//! | `set_brightness` | SetBrightness `[level]` |
//! | `set_backplate_color` | SetLighting `[r, g, b]` (flagship only) |
//! | `set_orientation` | SetOrientation `[0 \| 1]` |
//! | `display_bitmap` | DisplayBitmap `[x0, y0, x1, y1]` + pixel lines |
//! | `clear` / `reset` | full-screen white bitmap |
//! | `screen_off` / `screen_on` | SetBrightness(0) / SetBrightness(default) |
//!
//! ## Example
//!
//! ```
//! use lucero::{DeviceSession, DisplayConfig, MemoryTransport};
//!
//! let transport = MemoryTransport::with_reply(b"\xCAHELLO\x0A\x11\x00\xCA");
//! let mut session = DeviceSession::new(transport.clone(), DisplayConfig::default())?;
//!
//! let report = session.hello()?;
//! assert!(report.is_recognized());
//!
//! session.set_brightness(50)?;
//! session.flush();
//! assert_eq!(transport.writes().last().unwrap()[1], 127);
//! # Ok::<(), lucero::LuceroError>(())
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use image::{Rgb, RgbImage};
use tracing::{debug, info, warn};

use crate::dispatch::{WriteDispatcher, WriteJob};
use crate::display::{DisplayConfig, Orientation};
use crate::error::LuceroError;
use crate::protocol::frame::{self, Command, FRAME_LEN};
use crate::protocol::handshake::{self, Capabilities, HELLO_PAYLOAD, HandshakeReport, SubRevision};
use crate::protocol::pixel;
use crate::transport::{SerialTransport, Transport};

/// Highest user-facing brightness level.
pub const MAX_BRIGHTNESS: u8 = 100;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// HELLO has not been exchanged yet
    Unestablished,
    /// Handshake done; capabilities are fixed for the rest of the session
    Ready {
        sub_revision: SubRevision,
        capabilities: Capabilities,
    },
}

/// # Device Session
///
/// Owns the transport (shared with the dispatcher thread) and the
/// capabilities learned from the handshake. The transport is closed when the
/// session is dropped, after every queued write has been attempted.
#[derive(Debug)]
pub struct DeviceSession<T: Transport + 'static> {
    dispatcher: WriteDispatcher,
    transport: Arc<Mutex<T>>,
    config: DisplayConfig,
    state: SessionState,
}

impl DeviceSession<SerialTransport> {
    /// Open the serial device at `device` using the config's serial
    /// settings. The handshake is not performed.
    pub fn open<P: AsRef<Path>>(device: P, config: DisplayConfig) -> Result<Self, LuceroError> {
        let transport = SerialTransport::open(device, config.serial)?;
        Self::new(transport, config)
    }
}

impl<T: Transport + 'static> DeviceSession<T> {
    /// Wrap an open transport and start its write dispatcher.
    pub fn new(transport: T, config: DisplayConfig) -> Result<Self, LuceroError> {
        config.validate()?;
        let transport = Arc::new(Mutex::new(transport));
        let dispatcher = WriteDispatcher::spawn(Arc::clone(&transport))?;

        Ok(Self {
            dispatcher,
            transport,
            config,
            state: SessionState::Unestablished,
        })
    }

    /// Create a session and perform the handshake.
    pub fn connect(transport: T, config: DisplayConfig) -> Result<(Self, HandshakeReport), LuceroError> {
        let mut session = Self::new(transport, config)?;
        let report = session.hello()?;
        Ok((session, report))
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready { .. })
    }

    /// Sub-revision found by the handshake, if it has run.
    pub fn sub_revision(&self) -> Option<SubRevision> {
        match self.state {
            SessionState::Ready { sub_revision, .. } => Some(sub_revision),
            SessionState::Unestablished => None,
        }
    }

    fn capabilities(&self) -> Result<Capabilities, LuceroError> {
        match self.state {
            SessionState::Ready { capabilities, .. } => Ok(capabilities),
            SessionState::Unestablished => Err(LuceroError::NotReady),
        }
    }

    /// Block until every queued write has been attempted.
    pub fn flush(&self) {
        self.dispatcher.wait_idle();
    }

    // ========================================================================
    // HANDSHAKE
    // ========================================================================

    /// # HELLO Handshake
    ///
    /// Writes the HELLO frame directly to the transport, bypassing the
    /// dispatcher, and reads the 10-byte reply. `&mut self` guarantees no
    /// other call on this session is queuing writes meanwhile.
    ///
    /// An unexpected reply is not an error: each problem is logged as a
    /// warning, listed in the returned report, and the session continues
    /// with the most restrictive sub-revision (A01).
    ///
    /// ## Errors
    ///
    /// - [`LuceroError::AlreadyEstablished`] if the handshake already ran
    /// - [`LuceroError::Transport`] if the write or read itself fails
    pub fn hello(&mut self) -> Result<HandshakeReport, LuceroError> {
        if self.is_ready() {
            return Err(LuceroError::AlreadyEstablished);
        }

        let request = frame::build_frame(Command::Hello, &HELLO_PAYLOAD)?;
        let reply = {
            let mut transport = self.transport.lock().unwrap_or_else(PoisonError::into_inner);
            transport.write(&request)?;
            transport.read(FRAME_LEN)?
        };

        let report = handshake::parse_reply(&reply);
        for issue in &report.issues {
            warn!("{}", issue);
        }

        let sub_revision = report.effective();
        debug!("HW sub-revision: {}", sub_revision);

        self.state = SessionState::Ready {
            sub_revision,
            capabilities: sub_revision.capabilities(),
        };
        Ok(report)
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    fn send(&self, cmd: Command, payload: &[u8]) -> Result<(), LuceroError> {
        let frame = frame::build_frame(cmd, payload)?;
        self.dispatcher.enqueue(WriteJob::Command(frame));
        Ok(())
    }

    /// # Set Brightness (0-100)
    ///
    /// On 0-255 panels the level is scaled linearly. Panels without a
    /// brightness range only know on and off, with inverted polarity:
    /// `1` turns the backlight off and `0` is full brightness.
    ///
    /// ## Errors
    ///
    /// [`LuceroError::InvalidArgument`] if `level > 100`.
    pub fn set_brightness(&self, level: u8) -> Result<(), LuceroError> {
        let capabilities = self.capabilities()?;
        let value = brightness_value(capabilities, level)?;
        if !capabilities.brightness_range {
            info!("Your display does not support custom brightness level");
        }
        debug!(level, value, "set brightness");
        self.send(Command::SetBrightness, &[value])
    }

    /// Set the backplate LED colour. Only flagship panels have one; on other
    /// panels this logs and sends nothing.
    pub fn set_backplate_color(&self, color: Rgb<u8>) -> Result<(), LuceroError> {
        if !self.capabilities()?.rgb_backlight {
            info!("Only HW revision 'flagship' supports backplate LED color setting");
            return Ok(());
        }
        self.send(Command::SetLighting, &color.0)
    }

    pub fn set_orientation(&self, orientation: Orientation) -> Result<(), LuceroError> {
        self.capabilities()?;
        debug!(%orientation, "set orientation");
        self.send(Command::SetOrientation, &[orientation.device_value()])
    }

    /// Turn the screen off. There is no native command: brightness 0.
    pub fn screen_off(&self) -> Result<(), LuceroError> {
        self.set_brightness(0)
    }

    /// Turn the screen back on at the configured default brightness.
    pub fn screen_on(&self) -> Result<(), LuceroError> {
        self.set_brightness(self.config.brightness)
    }

    /// Clear the screen. There is no native command: a full-screen white
    /// bitmap is painted instead.
    pub fn clear(&self) -> Result<(), LuceroError> {
        let blank = RgbImage::from_pixel(
            self.config.width as u32,
            self.config.height as u32,
            Rgb([255, 255, 255]),
        );
        self.display_bitmap(&blank, 0, 0, 0, 0)
    }

    /// Reset the screen. There is no native command: same as [`clear`](Self::clear).
    pub fn reset(&self) -> Result<(), LuceroError> {
        self.clear()
    }

    /// Apply the configured orientation, brightness and backplate colour.
    pub fn apply_defaults(&self) -> Result<(), LuceroError> {
        self.set_orientation(self.config.orientation)?;
        self.set_brightness(self.config.brightness)?;
        self.set_backplate_color(Rgb(self.config.backplate_color))
    }

    // ========================================================================
    // BITMAPS
    // ========================================================================

    /// # Display Bitmap
    ///
    /// Paints the top-left `width` x `height` pixels of `image` with their
    /// top-left corner at (`x`, `y`).
    ///
    /// A zero `width` or `height` means the image's own size. An image larger
    /// than the display is cropped to the display size.
    ///
    /// ## Wire Traffic
    ///
    /// ```text
    /// CC x0 x0 y0 y0 x1 x1 y1 y1 CC      bounding box, inclusive, big-endian
    /// [pixel words, 8 display rows per write] ...
    /// ```
    ///
    /// The frame and all of its pixel lines are queued as one block.
    ///
    /// ## Errors
    ///
    /// [`LuceroError::InvalidArgument`] if `x` or `y` lies beyond the display,
    /// the resolved size is zero, or the region is larger than the image.
    pub fn display_bitmap(
        &self,
        image: &RgbImage,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<(), LuceroError> {
        self.capabilities()?;
        let region = resolve_region(&self.config, image, x, y, width, height)?;

        let header = frame::build_frame(
            Command::DisplayBitmap,
            &frame::bitmap_region(region.x0, region.y0, region.x1, region.y1),
        )?;
        let data = pixel::encode_region(image, region.width, region.height);
        debug!(
            x0 = region.x0,
            y0 = region.y0,
            x1 = region.x1,
            y1 = region.y1,
            bytes = data.len(),
            "display bitmap"
        );

        let lines = data
            .chunks(self.config.line_chunk_bytes())
            .map(|line| WriteJob::PixelLine(line.to_vec()));
        self.dispatcher
            .enqueue_many(std::iter::once(WriteJob::Command(header)).chain(lines));
        Ok(())
    }
}

/// Brightness byte to send for a 0-100 `level`.
///
/// | Panel | Level | Byte |
/// |-------|-------|------|
/// | 0-255 range | 0-100 | `level * 255 / 100` (truncated) |
/// | on/off | 0 | 1 (off) |
/// | on/off | 1-100 | 0 (full brightness) |
pub fn brightness_value(capabilities: Capabilities, level: u8) -> Result<u8, LuceroError> {
    if level > MAX_BRIGHTNESS {
        return Err(LuceroError::InvalidArgument(format!(
            "brightness level must be 0-100 (got {})",
            level
        )));
    }

    if capabilities.brightness_range {
        Ok((level as u16 * 255 / MAX_BRIGHTNESS as u16) as u8)
    } else if level == 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Inclusive bounding box of a bitmap, plus its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
    pub width: u32,
    pub height: u32,
}

/// Resolve and validate bitmap geometry against the display and the image.
pub fn resolve_region(
    config: &DisplayConfig,
    image: &RgbImage,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> Result<Region, LuceroError> {
    let (image_width, image_height) = image.dimensions();
    let (display_width, display_height) = (config.width as u32, config.height as u32);

    let mut width = if width == 0 { image_width } else { width as u32 };
    let mut height = if height == 0 { image_height } else { height as u32 };

    if image_height > display_height {
        height = display_height;
    }
    if image_width > display_width {
        width = display_width;
    }

    let invalid = |msg: String| -> Result<Region, LuceroError> {
        Err(LuceroError::InvalidArgument(msg))
    };
    if x as u32 > display_width {
        return invalid(format!("image X coordinate {} must be <= display width {}", x, display_width));
    }
    if y as u32 > display_height {
        return invalid(format!("image Y coordinate {} must be <= display height {}", y, display_height));
    }
    if width == 0 {
        return invalid("image width must be > 0".to_string());
    }
    if height == 0 {
        return invalid("image height must be > 0".to_string());
    }
    if width > image_width || height > image_height {
        return invalid(format!(
            "region {}x{} exceeds source image {}x{}",
            width, height, image_width, image_height
        ));
    }

    let x1 = u16::try_from(x as u32 + width - 1)
        .map_err(|_| LuceroError::InvalidArgument("bitmap extends past 65535".to_string()))?;
    let y1 = u16::try_from(y as u32 + height - 1)
        .map_err(|_| LuceroError::InvalidArgument("bitmap extends past 65535".to_string()))?;

    Ok(Region {
        x0: x,
        y0: y,
        x1,
        y1,
        width,
        height,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: Capabilities = Capabilities {
        rgb_backlight: false,
        brightness_range: true,
    };
    const BINARY: Capabilities = Capabilities {
        rgb_backlight: false,
        brightness_range: false,
    };

    #[test]
    fn test_brightness_range_scaling() {
        assert_eq!(brightness_value(RANGE, 0).unwrap(), 0);
        assert_eq!(brightness_value(RANGE, 50).unwrap(), 127);
        assert_eq!(brightness_value(RANGE, 100).unwrap(), 255);

        let mut previous = 0;
        for level in 0..=100 {
            let value = brightness_value(RANGE, level).unwrap();
            assert_eq!(value as u32, level as u32 * 255 / 100);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_brightness_binary_polarity() {
        assert_eq!(brightness_value(BINARY, 0).unwrap(), 1);
        for level in 1..=100 {
            assert_eq!(brightness_value(BINARY, level).unwrap(), 0);
        }
    }

    #[test]
    fn test_brightness_out_of_range() {
        assert!(matches!(
            brightness_value(RANGE, 101),
            Err(LuceroError::InvalidArgument(_))
        ));
        assert!(matches!(
            brightness_value(BINARY, 255),
            Err(LuceroError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_region_defaults_to_image_size() {
        let config = DisplayConfig::default();
        let image = RgbImage::new(100, 50);
        let region = resolve_region(&config, &image, 0, 0, 0, 0).unwrap();
        assert_eq!((region.x0, region.y0, region.x1, region.y1), (0, 0, 99, 49));
        assert_eq!((region.width, region.height), (100, 50));
    }

    #[test]
    fn test_region_offset() {
        let config = DisplayConfig::default();
        let image = RgbImage::new(100, 50);
        let region = resolve_region(&config, &image, 10, 20, 30, 40).unwrap();
        assert_eq!((region.x0, region.y0, region.x1, region.y1), (10, 20, 39, 59));
    }

    #[test]
    fn test_region_clamped_to_display() {
        let config = DisplayConfig::default();
        let image = RgbImage::new(1000, 1000);
        let region = resolve_region(&config, &image, 0, 0, 0, 0).unwrap();
        assert_eq!((region.width, region.height), (320, 480));
        assert_eq!((region.x1, region.y1), (319, 479));
    }

    #[test]
    fn test_region_rejects_bad_geometry() {
        let config = DisplayConfig::default();
        let image = RgbImage::new(10, 10);
        let bad = |x, y, w, h| resolve_region(&config, &image, x, y, w, h).is_err();

        assert!(bad(321, 0, 0, 0));
        assert!(bad(0, 481, 0, 0));
        assert!(bad(0, 0, 11, 0));
        assert!(bad(0, 0, 0, 11));
        // Edge coordinates are allowed
        assert!(!bad(320, 480, 0, 0));
    }

    #[test]
    fn test_region_rejects_empty_image() {
        let config = DisplayConfig::default();
        let image = RgbImage::new(0, 0);
        assert!(matches!(
            resolve_region(&config, &image, 0, 0, 0, 0),
            Err(LuceroError::InvalidArgument(_))
        ));
    }
}
