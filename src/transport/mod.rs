//! # Panel Transport Layer
//!
//! This module provides the byte streams a session talks to a panel over.
//!
//! ## Available Transports
//!
//! - [`serial`]: USB CDC serial device opened as a raw TTY (Linux/macOS)
//! - [`memory`]: In-memory transport that records writes and replays
//!   scripted reads, for tests and dry runs

pub mod memory;
pub mod serial;

pub use memory::MemoryTransport;
pub use serial::{SerialSettings, SerialTransport};

use crate::error::TransportError;

/// # Ordered Byte Stream
///
/// A reliable, ordered, write-timeout-bounded link to a panel.
///
/// Writes either deliver the whole buffer or fail; a congested link reports
/// [`TransportError::Timeout`]. `read` is only used during the HELLO
/// handshake and may return fewer than `n` bytes if the read timeout
/// expires first.
pub trait Transport: Send {
    /// Write the whole buffer.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read up to `n` bytes, blocking until they arrive or the read timeout
    /// expires.
    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(n)
    }
}
