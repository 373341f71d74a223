//! Core types and data structures for the exerciser loop

/// Running totals for one exerciser run.
///
/// Counts only ever grow; they are reset by creating a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferCounters {
    /// Bytes accepted by the channel
    pub bytes_written: u64,
    /// Bytes received from the channel
    pub bytes_read: u64,
    /// Received bytes that diverged from the expected sequence
    pub mismatches: u64,
}

impl TransferCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet echoed back, for write-follows-read mode
    pub fn read_surplus(&self) -> u64 {
        self.bytes_read.saturating_sub(self.bytes_written)
    }
}

/// Which directions are still being exercised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directions {
    pub rx: bool,
    pub tx: bool,
}

impl Directions {
    pub fn new(rx: bool, tx: bool) -> Self {
        Self { rx, tx }
    }

    /// False once both directions are off, which ends the loop
    pub fn any(&self) -> bool {
        self.rx || self.tx
    }
}

/// Conditions a readiness poll should wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

/// Conditions a readiness poll reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

/// Rate in bits per second over `elapsed_ms`, as reported by the statistics line.
pub fn bits_per_second(bytes: u64, elapsed_ms: u64) -> u64 {
    bytes.saturating_mul(8 * 1000) / elapsed_ms.max(1)
}
