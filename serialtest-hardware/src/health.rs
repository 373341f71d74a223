//! Health monitor
//!
//! Tracks when data last moved in each direction, decides when statistics and
//! stall warnings are due, and switches directions off once their run-time
//! caps expire.

use serialtest_core::{Directions, LoopConfig, TransferCounters};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Longest the loop sleeps in a readiness poll
pub const POLL_CEILING: Duration = Duration::from_secs(1);

/// Quiet time after which a direction counts as stalled
pub const STALL_THRESHOLD: Duration = Duration::from_secs(2);

/// Minimum time between two stall warnings
pub const STALL_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Time between two statistics lines
pub const STATS_INTERVAL: Duration = Duration::from_secs(2);

/// Monotonic timestamps of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timing {
    started: Instant,
    last_read: Instant,
    last_write: Instant,
    last_stats: Instant,
    last_stall_report: Instant,
}

impl Timing {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            last_read: now,
            last_write: now,
            last_stats: now,
            last_stall_report: now,
        }
    }
}

/// Directions that have gone quiet, with how long they have been quiet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stall {
    pub rx: Option<Duration>,
    pub tx: Option<Duration>,
}

/// Directions switched off by a cap during one check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapExpiry {
    pub tx_stopped: bool,
    pub rx_stopped: bool,
}

/// Per-iteration timing checks
#[derive(Debug)]
pub struct HealthMonitor {
    timing: Timing,
    tx_cap: Option<Duration>,
    rx_cap: Option<Duration>,
    tx_stopped_by_cap: bool,
}

impl HealthMonitor {
    pub fn new(config: &LoopConfig, now: Instant) -> Self {
        Self {
            timing: Timing::new(now),
            tx_cap: config.tx_time,
            rx_cap: config.rx_time,
            tx_stopped_by_cap: false,
        }
    }

    /// Run time so far
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timing.started)
    }

    pub fn since_read(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timing.last_read)
    }

    pub fn since_write(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timing.last_write)
    }

    /// Note a read that returned data
    pub fn record_read(&mut self, now: Instant) {
        self.timing.last_read = self.timing.last_read.max(now);
    }

    /// Note a write that moved data
    pub fn record_write(&mut self, now: Instant) {
        self.timing.last_write = self.timing.last_write.max(now);
    }

    /// Stall check, at most once per [`STALL_REPORT_INTERVAL`] of reports.
    ///
    /// A receive stall is not reported once transmission has been stopped by
    /// its cap and everything sent has come back: that is how a finite
    /// loopback test ends.
    pub fn check_stalls(
        &mut self,
        now: Instant,
        directions: Directions,
        counters: &TransferCounters,
    ) -> Option<Stall> {
        if now.saturating_duration_since(self.timing.last_stall_report) <= STALL_REPORT_INTERVAL {
            return None;
        }

        let since_read = self.since_read(now);
        let since_write = self.since_write(now);

        let mut rx = (directions.rx && since_read > STALL_THRESHOLD).then_some(since_read);
        let tx = (directions.tx && since_write > STALL_THRESHOLD).then_some(since_write);

        if self.tx_stopped_by_cap
            && counters.bytes_written != 0
            && counters.bytes_written == counters.bytes_read
        {
            rx = None;
        }

        if rx.is_none() && tx.is_none() {
            return None;
        }

        self.timing.last_stall_report = now;
        Some(Stall { rx, tx })
    }

    /// Whether a statistics line is due; restarts the interval when it is
    pub fn stats_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.timing.last_stats) >= STATS_INTERVAL {
            self.timing.last_stats = now;
            true
        } else {
            false
        }
    }

    /// Switch off directions whose run-time cap has been reached.
    ///
    /// Each cap fires once; a stopped direction never comes back.
    pub fn expire_caps(&mut self, now: Instant, directions: &mut Directions) -> CapExpiry {
        let elapsed = self.elapsed(now);
        let mut expiry = CapExpiry::default();

        if let Some(cap) = self.tx_cap {
            if elapsed >= cap {
                self.tx_cap = None;
                self.tx_stopped_by_cap = true;
                directions.tx = false;
                expiry.tx_stopped = true;
                debug!("tx time cap of {:?} reached", cap);
            }
        }

        if let Some(cap) = self.rx_cap {
            if elapsed >= cap {
                self.rx_cap = None;
                directions.rx = false;
                expiry.rx_stopped = true;
                debug!("rx time cap of {:?} reached", cap);
            }
        }

        expiry
    }
}
