//! # In-Memory Transport
//!
//! Records every write and serves reads from a scripted reply buffer.
//! Clones share state, so a test can hand one clone to a session and keep
//! another to inspect what was sent.
//!
//! ## Example
//!
//! ```
//! use lucero::transport::{MemoryTransport, Transport};
//!
//! let probe = MemoryTransport::new();
//! let mut transport = probe.clone();
//! transport.write(&[1, 2, 3])?;
//!
//! assert_eq!(probe.writes(), vec![vec![1, 2, 3]]);
//! # Ok::<(), lucero::error::TransportError>(())
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::Transport;
use crate::error::TransportError;

#[derive(Debug, Default)]
struct State {
    writes: Vec<Vec<u8>>,
    replies: VecDeque<u8>,
    timeouts: VecDeque<bool>,
    write_delay: Duration,
}

/// Recording transport backed by shared memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that answers the HELLO handshake with the given reply.
    pub fn with_reply(reply: &[u8]) -> Self {
        let transport = Self::new();
        transport.queue_reply(reply);
        transport
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append bytes to be returned by subsequent reads.
    pub fn queue_reply(&self, bytes: &[u8]) {
        self.state().replies.extend(bytes);
    }

    /// Make the next `count` writes fail with [`TransportError::Timeout`].
    pub fn fail_next_writes(&self, count: usize) {
        self.state().timeouts.extend(std::iter::repeat_n(true, count));
    }

    /// Schedule write outcomes: `true` times out, `false` succeeds.
    pub fn script_writes(&self, outcomes: &[bool]) {
        self.state().timeouts.extend(outcomes);
    }

    /// Sleep this long inside every write, to emulate a slow panel.
    pub fn set_write_delay(&self, delay: Duration) {
        self.state().write_delay = delay;
    }

    /// Every successful write, in order, one entry per `write` call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// All successfully written bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state().writes.concat()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let delay = self.state().write_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state();
        if state.timeouts.pop_front().unwrap_or(false) {
            return Err(TransportError::Timeout);
        }
        state.writes.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        let available = n.min(state.replies.len());
        Ok(state.replies.drain(..available).collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
