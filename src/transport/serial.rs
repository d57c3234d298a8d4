//! # USB Serial Transport
//!
//! Revision B panels enumerate as a USB CDC-ACM device (`/dev/ttyACM0` on
//! Linux, `/dev/cu.usbmodem*` on macOS). This transport opens that device
//! as a raw TTY.
//!
//! ## TTY Configuration
//!
//! The device is opened non-blocking and configured so binary data passes
//! through unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR,
//!   ICRNL, IXON, IXOFF, IXANY cleared
//! - **No output processing**: OPOST cleared
//! - **8N1**: CS8, no parity, one stop bit, no hardware flow control
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN cleared
//!
//! Software flow control must stay off: `0x11` and `0x13` show up in pixel
//! data all the time.
//!
//! ## Timeouts
//!
//! Reads and writes wait on `poll(2)` with a deadline. A write that cannot
//! complete before the write timeout fails with
//! [`TransportError::Timeout`]; the panel stops draining its USB endpoint
//! while it is busy redrawing, so this is how congestion shows up.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Transport;
use crate::error::{LuceroError, TransportError};

/// Default baud rate. CDC-ACM ignores it, but the panel firmware expects it.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Default read timeout (HELLO reply)
const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default write timeout
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;

/// Serial line settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub baud: u32,
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    #[serde(with = "millis")]
    pub write_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// # Serial Panel Transport
///
/// ## Example
///
/// ```no_run
/// use lucero::transport::{SerialSettings, SerialTransport};
///
/// let transport = SerialTransport::open("/dev/ttyACM0", SerialSettings::default())?;
/// # Ok::<(), lucero::LuceroError>(())
/// ```
#[derive(Debug)]
pub struct SerialTransport {
    file: File,
    settings: SerialSettings,
}

impl SerialTransport {
    /// Open and configure the serial device.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need the dialout/uucp group)
    /// - The baud rate is not supported
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P, settings: SerialSettings) -> Result<Self, LuceroError> {
        let path = device.as_ref();
        let file = open_nonblocking(path).map_err(TransportError::Io)?;

        configure_tty_raw(&file, settings.baud)?;
        debug!(device = %path.display(), baud = settings.baud, "serial port opened");

        Ok(Self { file, settings })
    }

    pub fn settings(&self) -> SerialSettings {
        self.settings
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let deadline = Instant::now() + self.settings.write_timeout;
        let mut remaining = data;

        while !remaining.is_empty() {
            match self.file.write(remaining) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => remaining = &remaining[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    wait_ready(&self.file, Readiness::Writable, deadline)?;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + self.settings.read_timeout;
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    match wait_ready(&self.file, Readiness::Readable, deadline) {
                        Ok(()) => {}
                        Err(TransportError::Timeout) => break,
                        Err(e) => return Err(e),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

// ============================================================================
// PLATFORM HELPERS
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Readiness {
    Readable,
    Writable,
}

#[cfg(unix)]
fn open_nonblocking(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
fn open_nonblocking(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

/// Block until the descriptor is ready or `deadline` passes.
#[cfg(unix)]
fn wait_ready(file: &File, readiness: Readiness, deadline: Instant) -> Result<(), TransportError> {
    use std::os::unix::io::AsRawFd;

    let events = match readiness {
        Readiness::Readable => libc::POLLIN,
        Readiness::Writable => libc::POLLOUT,
    };

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(TransportError::Timeout);
        }
        let timeout_ms = (deadline - now).as_millis().clamp(1, libc::c_int::MAX as u128);

        let mut pfd = libc::pollfd {
            fd: file.as_raw_fd(),
            events,
            revents: 0,
        };
        let result = unsafe { libc::poll(&mut pfd, 1, timeout_ms as libc::c_int) };

        match result {
            0 => return Err(TransportError::Timeout),
            n if n > 0 => {
                if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0
                    && pfd.revents & events == 0
                {
                    return Err(TransportError::Closed);
                }
                return Ok(());
            }
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err.into());
                }
            }
        }
    }
}

#[cfg(not(unix))]
fn wait_ready(_file: &File, _readiness: Readiness, deadline: Instant) -> Result<(), TransportError> {
    if Instant::now() >= deadline {
        return Err(TransportError::Timeout);
    }
    std::thread::sleep(Duration::from_millis(1));
    Ok(())
}

/// Map a numeric baud rate to its termios constant.
#[cfg(unix)]
fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    match baud {
        9_600 => Some(libc::B9600),
        19_200 => Some(libc::B19200),
        38_400 => Some(libc::B38400),
        57_600 => Some(libc::B57600),
        115_200 => Some(libc::B115200),
        230_400 => Some(libc::B230400),
        _ => None,
    }
}

/// Configure a serial device for raw 8N1 binary communication.
#[cfg(unix)]
fn configure_tty_raw(file: &File, baud: u32) -> Result<(), LuceroError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let speed = baud_constant(baud)
        .ok_or_else(|| LuceroError::Config(format!("unsupported baud rate {}", baud)))?;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(TransportError::Io(io::Error::last_os_error()).into());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB | libc::CRTSCTS);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;

    // Reads are paced by poll(), not by the line discipline
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 0;

    unsafe {
        if libc::cfsetispeed(&mut termios, speed) != 0 || libc::cfsetospeed(&mut termios, speed) != 0
        {
            return Err(TransportError::Io(io::Error::last_os_error()).into());
        }
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(TransportError::Io(io::Error::last_os_error()).into());
    }

    // Drop anything the panel sent before we were listening
    unsafe {
        libc::tcflush(fd, libc::TCIOFLUSH);
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File, _baud: u32) -> Result<(), LuceroError> {
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
