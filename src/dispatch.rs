//! # Write Dispatcher
//!
//! All traffic to a panel after the handshake goes through one FIFO queue,
//! drained by a single background thread. Producers return as soon as their
//! jobs are queued.
//!
//! ## Ordering
//!
//! - Jobs are written strictly in enqueue order, one at a time.
//! - [`WriteDispatcher::enqueue_many`] appends its jobs under a single lock,
//!   so a bitmap's command frame and pixel lines are never interleaved with
//!   another producer's jobs.
//!
//! ## Failure Policy
//!
//! A job whose write fails is logged and dropped. Nothing is retried and
//! the producer is not told: under overload the link stays responsive at the
//! cost of losing a backlogged frame.
//!
//! ```text
//!  producers                     queue                 drain thread
//!  ─────────                     ─────                 ────────────
//!  set_brightness ──enqueue──►  ┌──────────┐
//!                               │ frame    │ ──pop──►  transport.write()
//!  display_bitmap ──enqueue──►  │ frame    │
//!                   _many       │ line     │
//!                               │ line ... │
//!                               └──────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{error, trace, warn};

use crate::error::{LuceroError, TransportError};
use crate::protocol::frame::Frame;
use crate::transport::Transport;

/// One pending write.
#[derive(Clone, PartialEq, Eq)]
pub enum WriteJob {
    /// A 10-byte command frame
    Command(Frame),
    /// A chunk of encoded pixel data following a DisplayBitmap frame
    PixelLine(Vec<u8>),
}

impl WriteJob {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Command(frame) => frame,
            Self::PixelLine(line) => line,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Command(_) => "data",
            Self::PixelLine(_) => "line",
        }
    }
}

impl fmt::Debug for WriteJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(frame) => write!(f, "Command({:02X?})", frame),
            Self::PixelLine(line) => write!(f, "PixelLine({} bytes)", line.len()),
        }
    }
}

#[derive(Debug, Default)]
struct Queue {
    jobs: VecDeque<WriteJob>,
    in_flight: bool,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<Queue>,
    /// Signalled when jobs arrive or the dispatcher closes
    work: Condvar,
    /// Signalled when the queue empties with nothing in flight
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// # Write Dispatcher
///
/// Owns the pending-write queue and the thread that drains it onto a shared
/// transport. Dropping the dispatcher writes out every job already queued
/// and then joins the thread.
///
/// ## Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use lucero::dispatch::{WriteDispatcher, WriteJob};
/// use lucero::transport::MemoryTransport;
///
/// let probe = MemoryTransport::new();
/// let dispatcher = WriteDispatcher::spawn(Arc::new(Mutex::new(probe.clone())))?;
///
/// dispatcher.enqueue(WriteJob::PixelLine(vec![1, 2]));
/// dispatcher.enqueue(WriteJob::PixelLine(vec![3]));
/// dispatcher.wait_idle();
///
/// assert_eq!(probe.writes(), vec![vec![1, 2], vec![3]]);
/// # Ok::<(), lucero::LuceroError>(())
/// ```
#[derive(Debug)]
pub struct WriteDispatcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl WriteDispatcher {
    /// Start the drain thread for `transport`.
    pub fn spawn<T: Transport + 'static>(transport: Arc<Mutex<T>>) -> Result<Self, LuceroError> {
        let shared = Arc::new(Shared::default());
        let worker = thread::Builder::new()
            .name("lucero-dispatch".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || drain(&shared, &transport)
            })?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Append one job to the tail of the queue.
    pub fn enqueue(&self, job: WriteJob) {
        let mut queue = self.shared.lock();
        queue.jobs.push_back(job);
        self.shared.work.notify_one();
    }

    /// Append a sequence of jobs as one contiguous block.
    pub fn enqueue_many<I>(&self, jobs: I)
    where
        I: IntoIterator<Item = WriteJob>,
    {
        let mut queue = self.shared.lock();
        queue.jobs.extend(jobs);
        self.shared.work.notify_one();
    }

    /// Number of jobs waiting to be written (excluding one in flight).
    pub fn pending(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    /// Block until every queued job has been written (or dropped).
    pub fn wait_idle(&self) {
        let mut queue = self.shared.lock();
        while !queue.jobs.is_empty() || queue.in_flight {
            queue = self
                .shared
                .idle
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for WriteDispatcher {
    fn drop(&mut self) {
        self.shared.lock().closed = true;
        self.shared.work.notify_one();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("write dispatcher thread panicked");
            }
        }
    }
}

/// Drain loop: pop the head, write it, repeat until closed and empty.
fn drain<T: Transport>(shared: &Shared, transport: &Mutex<T>) {
    loop {
        let job = {
            let mut queue = shared.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    queue.in_flight = true;
                    break job;
                }
                if queue.closed {
                    return;
                }
                queue = shared.work.wait(queue).unwrap_or_else(PoisonError::into_inner);
            }
        };

        write_job(transport, &job);

        let mut queue = shared.lock();
        queue.in_flight = false;
        if queue.jobs.is_empty() {
            shared.idle.notify_all();
        }
    }
}

fn write_job<T: Transport>(transport: &Mutex<T>, job: &WriteJob) {
    let mut transport = transport.lock().unwrap_or_else(PoisonError::into_inner);
    match transport.write(job.bytes()) {
        Ok(()) => trace!(job = ?job, "written"),
        Err(TransportError::Timeout) => {
            warn!("(Write {}) Too fast! Slow down! Dropped {:?}", job.kind(), job);
        }
        Err(e) => error!("(Write {}) {}: dropped {:?}", job.kind(), e, job),
    }
}

// ============================================================================
// TESTS
// ============================================================================
