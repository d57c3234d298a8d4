//! # Lucero - Smart LCD Panel Driver
//!
//! Lucero drives the "revision B" family of USB-serial smart LCD panels
//! (3.5" 320x480, including the "flagship" variant with an RGB backplate
//! LED). It provides:
//!
//! - **Protocol implementation**: 10-byte command frames and HELLO handshake
//! - **Pixel encoding**: RGB888 to the panel's packed 16-bit layout
//! - **Write dispatch**: an ordered background queue so callers never block
//!   on the serial link
//! - **Transport**: raw TTY serial communication
//!
//! ## Quick Start
//!
//! ```no_run
//! use lucero::{DeviceSession, DisplayConfig, Orientation};
//!
//! let config = DisplayConfig::turing_3_5();
//! let mut session = DeviceSession::open("/dev/ttyACM0", config)?;
//!
//! // Detect the hardware sub-revision
//! let report = session.hello()?;
//! println!("sub-revision: {}", report.effective());
//!
//! // Configure and paint
//! session.set_orientation(Orientation::Portrait)?;
//! session.set_brightness(40)?;
//!
//! let image = image::open("background.png")
//!     .map_err(|e| lucero::LuceroError::Image(e.to_string()))?
//!     .to_rgb8();
//! session.display_bitmap(&image, 0, 0, 0, 0)?;
//!
//! // Wait for the queue to drain before exiting
//! session.flush();
//!
//! # Ok::<(), lucero::LuceroError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Frames, handshake, pixel encoding |
//! | [`dispatch`] | Ordered write queue |
//! | [`session`] | Device session and display operations |
//! | [`transport`] | Communication backends |
//! | [`display`] | Display configuration |
//! | [`error`] | Error types |

pub mod dispatch;
pub mod display;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use display::{DisplayConfig, Orientation};
pub use error::LuceroError;
pub use session::DeviceSession;
pub use transport::{MemoryTransport, SerialTransport};
