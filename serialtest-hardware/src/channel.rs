//! Channel adapter seam
//!
//! The exerciser loop talks to the line through [`Channel`]: a non-blocking
//! duplex byte channel with a readiness poll. `SerialChannel` implements it
//! over a real tty; tests use a scripted mock.

use async_trait::async_trait;
use serialtest_core::{Interest, Readiness};
use std::io;
use std::time::Duration;

/// Trait for the opened, non-blocking duplex byte channel
#[async_trait]
pub trait Channel: Send {
    /// Wait up to `timeout` for any condition in `interest`.
    ///
    /// Returns an empty [`Readiness`] when the timeout elapses. With an empty
    /// interest this just sleeps for `timeout`.
    async fn ready(&mut self, interest: Interest, timeout: Duration) -> io::Result<Readiness>;

    /// Read whatever is available. `WouldBlock` means no data right now.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as much of `buf` as the channel accepts. `WouldBlock` means
    /// nothing was accepted.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Wait until everything written has left the transmitter
    async fn drain(&mut self) -> io::Result<()>;

    /// Undo line-state side effects of the run (discard both queues)
    fn restore(&mut self) -> io::Result<()>;

    /// Name used in report lines, usually the device path
    fn name(&self) -> &str;
}

/// Whether an I/O error only means "no progress right now"
pub fn is_would_block(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
