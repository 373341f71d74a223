//! Exerciser session
//!
//! Owns the channel, the loop state and the console for one run, and drives
//! the poll / transfer / monitor loop until both directions are off or an
//! error aborts the run. [`Session::shutdown`] then drains the line, prints
//! the final statistics and restores the line state on every path.

use crate::channel::Channel;
use crate::console::Console;
use crate::engine::TransferEngine;
use crate::health::{HealthMonitor, POLL_CEILING};
use serialtest_core::{
    Directions, ExerciserError, Interest, LoopConfig, Readiness, Result, RunSummary,
    TransferCounters,
};
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Gate still closed: time left until `delay` has passed since the last event
fn remaining(delay: Option<Duration>, since: Duration) -> Option<Duration> {
    delay
        .and_then(|delay| delay.checked_sub(since))
        .filter(|left| !left.is_zero())
}

fn gate_open(delay: Option<Duration>, since: Duration) -> bool {
    delay.map_or(true, |delay| since >= delay)
}

/// One exerciser run over a channel
pub struct Session<C: Channel, W: Write> {
    channel: C,
    console: Console<W>,
    config: LoopConfig,
    engine: TransferEngine,
    health: HealthMonitor,
    counters: TransferCounters,
    directions: Directions,
}

impl<C: Channel, W: Write> Session<C, W> {
    /// Create a session; fails if the configuration is inconsistent
    pub fn new(channel: C, config: LoopConfig, console: Console<W>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            engine: TransferEngine::new(&config),
            health: HealthMonitor::new(&config, Instant::now()),
            counters: TransferCounters::new(),
            directions: Directions::new(config.rx_enabled, config.tx_enabled),
            channel,
            console,
            config,
        })
    }

    pub fn counters(&self) -> &TransferCounters {
        &self.counters
    }

    pub fn directions(&self) -> Directions {
        self.directions
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Run the loop until both directions are off.
    ///
    /// Returns early with a fatal I/O error or, with stop-on-error, the first
    /// data mismatch. Counters keep their values either way.
    pub async fn run(&mut self) -> Result<()> {
        self.health = HealthMonitor::new(&self.config, Instant::now());

        info!(
            "Exercising {}: rx {}, tx {}, {} byte writes",
            self.channel.name(),
            if self.directions.rx { "on" } else { "off" },
            if self.directions.tx { "on" } else { "off" },
            self.config.chunk_size()
        );

        while self.directions.any() {
            let now = Instant::now();
            let interest = self.interest(now);
            let wait = self.poll_timeout(now);

            let readiness = self.channel.ready(interest, wait).await.map_err(|e| {
                error!("poll() on {} failed: {}", self.channel.name(), e);
                ExerciserError::Poll(e)
            })?;

            self.transfer(readiness, Instant::now())?;
            self.monitor(Instant::now())?;
        }

        debug!("Both directions stopped");
        Ok(())
    }

    /// Drain the line, print final statistics and restore line state.
    ///
    /// Failures here are logged, never returned, so the exit status always
    /// reflects the run itself.
    pub async fn shutdown(&mut self) -> RunSummary {
        if let Err(e) = self.channel.drain().await {
            warn!("Failed to drain {}: {}", self.channel.name(), e);
        }

        let elapsed = self.health.elapsed(Instant::now());
        if let Err(e) = self.console.stats(elapsed, &self.counters) {
            warn!("Failed to write final statistics: {}", e);
        }
        if let Err(e) = self.console.flush() {
            warn!("Failed to flush output: {}", e);
        }

        if let Err(e) = self.channel.restore() {
            warn!("Failed to restore {}: {}", self.channel.name(), e);
        }

        RunSummary {
            rx_enabled: self.config.rx_enabled,
            tx_enabled: self.config.tx_enabled,
            counters: self.counters,
        }
    }

    /// Writes are held back while the line has been quiet for less than the
    /// rx timeout
    fn writes_held(&self, now: Instant) -> bool {
        self.config
            .rx_timeout
            .is_some_and(|timeout| self.health.since_read(now) < timeout)
    }

    fn interest(&self, now: Instant) -> Interest {
        let read =
            self.directions.rx && gate_open(self.config.rx_delay, self.health.since_read(now));
        let write = self.directions.tx
            && gate_open(self.config.tx_delay, self.health.since_write(now))
            && !self.writes_held(now)
            && self.engine.write_size(&self.counters) > 0;

        Interest { read, write }
    }

    /// Poll ceiling, shortened to the next moment a closed gate opens
    fn poll_timeout(&self, now: Instant) -> Duration {
        let since_read = self.health.since_read(now);
        let since_write = self.health.since_write(now);
        let mut wait = POLL_CEILING;

        if self.directions.rx {
            if let Some(left) = remaining(self.config.rx_delay, since_read) {
                wait = wait.min(left);
            }
        }
        if self.directions.tx {
            if let Some(left) = remaining(self.config.tx_delay, since_write) {
                wait = wait.min(left);
            }
            if let Some(left) = remaining(self.config.rx_timeout, since_read) {
                wait = wait.min(left);
            }
        }

        wait
    }

    fn transfer(&mut self, readiness: Readiness, now: Instant) -> Result<()> {
        let mut hold_writes = false;

        if readiness.readable && self.directions.rx {
            if gate_open(self.config.rx_delay, self.health.since_read(now)) {
                let count = self
                    .engine
                    .read(&mut self.channel, &mut self.counters, &mut self.console)?;
                if count > 0 {
                    self.health.record_read(Instant::now());
                }
            }
            // Reads take priority until the line goes quiet
            hold_writes = self.config.rx_timeout.is_some();
        } else if self.writes_held(now) {
            hold_writes = true;
        }

        if !hold_writes
            && readiness.writable
            && self.directions.tx
            && gate_open(self.config.tx_delay, self.health.since_write(now))
        {
            let count = self
                .engine
                .write(&mut self.channel, &mut self.counters, &mut self.console)?;
            if count > 0 {
                self.health.record_write(Instant::now());
            }
        }

        Ok(())
    }

    fn monitor(&mut self, now: Instant) -> Result<()> {
        if let Some(stall) = self.health.check_stalls(now, self.directions, &self.counters) {
            self.console.stall(&stall)?;
        }

        if self.config.stats && self.health.stats_due(now) {
            self.console.stats(self.health.elapsed(now), &self.counters)?;
        }

        let expiry = self.health.expire_caps(now, &mut self.directions);
        if expiry.tx_stopped {
            info!("tx time elapsed on {}", self.channel.name());
            self.console.notice("Stopped transmitting.")?;
        }
        if expiry.rx_stopped {
            info!("rx time elapsed on {}", self.channel.name());
            self.console.notice("Stopped receiving.")?;
        }

        Ok(())
    }
}
