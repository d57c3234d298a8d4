//! # Error Types
//!
//! This module defines error types used throughout the lucero library.
//!
//! Only conditions that are fatal to a single call surface here. Degraded
//! behaviour (a panel tier without RGB backlight, an unrecognised handshake
//! reply, a congested serial link while draining the write queue) is logged
//! and handled where it happens.

use thiserror::Error;

/// Errors raised by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The write did not complete before the write timeout.
    ///
    /// The panel stops reading while it is busy, so this is the normal
    /// symptom of sending faster than it can consume.
    #[error("write timed out")]
    Timeout,

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error type for lucero operations
#[derive(Debug, Error)]
pub enum LuceroError {
    /// Transport-level errors (open, handshake I/O)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Out-of-range argument (brightness level, bitmap geometry)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command payload does not fit in a frame
    #[error("Invalid payload: {len} bytes (frames carry at most 8)")]
    InvalidPayload { len: usize },

    /// Operation issued before the HELLO handshake
    #[error("Session not ready: HELLO handshake has not been performed")]
    NotReady,

    /// HELLO issued on a session that already completed it
    #[error("Session already established")]
    AlreadyEstablished,

    /// Display configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Image loading error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
