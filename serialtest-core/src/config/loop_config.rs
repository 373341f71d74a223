//! Exerciser loop configuration
//!
//! Immutable once the loop starts.

use crate::sequence::WrapMode;
use crate::{ExerciserError, Result};
use std::time::Duration;

/// Bytes per write when no fixed chunk size is configured
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Largest accepted fixed chunk size
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Parameters the transfer engine and health monitor run with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Receive and verify incoming data
    pub rx_enabled: bool,
    /// Transmit the generated sequence
    pub tx_enabled: bool,
    /// Minimum time between successful reads
    pub rx_delay: Option<Duration>,
    /// Minimum time between successful writes
    pub tx_delay: Option<Duration>,
    /// Fixed number of bytes per write; `None` writes [`DEFAULT_CHUNK_SIZE`]
    /// and retries failed writes within the same iteration
    pub tx_bytes: Option<usize>,
    /// Keep reading and hold back writes until the line has been quiet this long
    pub rx_timeout: Option<Duration>,
    /// Stop transmitting after this much run time
    pub tx_time: Option<Duration>,
    /// Stop receiving after this much run time
    pub rx_time: Option<Duration>,
    /// Only send as many bytes as have been received beyond those already sent
    pub write_follows_read: bool,
    /// Abort the run on the first mismatch
    pub stop_on_error: bool,
    /// Report every mismatch
    pub dump_errors: bool,
    /// Emit periodic statistics
    pub stats: bool,
    /// Byte range of the generated sequence
    pub wrap: WrapMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rx_enabled: true,
            tx_enabled: true,
            rx_delay: None,
            tx_delay: None,
            tx_bytes: None,
            rx_timeout: None,
            tx_time: None,
            rx_time: None,
            write_follows_read: false,
            stop_on_error: false,
            dump_errors: false,
            stats: false,
            wrap: WrapMode::Full,
        }
    }
}

impl LoopConfig {
    /// Size of the outgoing write buffer
    pub fn chunk_size(&self) -> usize {
        self.tx_bytes.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Size of the receive buffer; twice the chunk to drain bursts
    pub fn read_buffer_len(&self) -> usize {
        self.chunk_size().saturating_mul(2)
    }

    /// Whether a write that moved nothing is retried within the same iteration
    pub fn repeat_writes(&self) -> bool {
        self.tx_bytes.is_none()
    }

    /// Check option combinations before a run
    pub fn validate(&self) -> Result<()> {
        match self.tx_bytes {
            Some(0) => {
                return Err(ExerciserError::InvalidInput(
                    "tx bytes must be greater than zero".to_string(),
                ))
            }
            Some(bytes) if bytes > MAX_CHUNK_SIZE => {
                return Err(ExerciserError::InvalidInput(format!(
                    "tx bytes must be at most {}, got {}",
                    MAX_CHUNK_SIZE, bytes
                )))
            }
            _ => {}
        }

        if self.rx_timeout.is_some() && self.tx_delay.is_none() {
            return Err(ExerciserError::Config(
                "--tx-delay needed for --rx-timeout".to_string(),
            ));
        }

        Ok(())
    }
}
