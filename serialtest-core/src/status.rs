//! Result aggregation
//!
//! Folds the counters of a finished run into one bounded process status.

use crate::error::Result;
use crate::types::TransferCounters;

/// Status when an enabled direction never moved a single byte
pub const EXIT_NOTHING_HAPPENED: i32 = 127;

/// Upper bound for count-derived statuses
pub const EXIT_STATUS_CAP: i32 = 125;

/// Summary of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Reading was enabled when the run started
    pub rx_enabled: bool,
    /// Writing was enabled when the run started
    pub tx_enabled: bool,
    pub counters: TransferCounters,
}

impl RunSummary {
    /// Process status for a run that ended normally.
    ///
    /// - an enabled direction that transferred nothing: 127
    /// - one direction only: mismatch count
    /// - both directions: count divergence plus mismatch count
    ///
    /// Count-derived values are capped at 125.
    pub fn exit_status(&self) -> i32 {
        let c = &self.counters;

        if (self.rx_enabled && c.bytes_read == 0) || (self.tx_enabled && c.bytes_written == 0) {
            return EXIT_NOTHING_HAPPENED;
        }

        let result = if self.rx_enabled && self.tx_enabled {
            c.bytes_written.abs_diff(c.bytes_read).saturating_add(c.mismatches)
        } else {
            c.mismatches
        };

        result.min(EXIT_STATUS_CAP as u64) as i32
    }

    /// Process status for a run that ended with `outcome`.
    ///
    /// Errors that aborted the loop take precedence over the counters.
    pub fn status_for(&self, outcome: &Result<()>) -> i32 {
        match outcome {
            Ok(()) => self.exit_status(),
            Err(e) => e.exit_status(),
        }
    }
}
