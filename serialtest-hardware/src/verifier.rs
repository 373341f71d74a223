//! Receive-side sequence verification

use crate::console::Console;
use serialtest_core::{ExerciserError, LoopConfig, Result, RunningCounter, TransferCounters};
use std::io::Write;

/// Outcome of checking one received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First byte of the run; the expected sequence starts from it
    Seeded,
    Match,
    /// The byte diverged; the expected sequence now continues from it
    Mismatch { expected: u8 },
}

/// Checks received bytes against the expected running sequence
#[derive(Debug)]
pub struct Verifier {
    expected: RunningCounter,
    seeded: bool,
    dump_errors: bool,
    stop_on_error: bool,
}

impl Verifier {
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            expected: RunningCounter::new(config.wrap),
            seeded: false,
            dump_errors: config.dump_errors,
            stop_on_error: config.stop_on_error,
        }
    }

    /// Value the next received byte should have
    pub fn expected(&self) -> u8 {
        self.expected.value()
    }

    /// Compare `actual` with the expected value and advance.
    ///
    /// A mismatch resynchronises onto `actual`, so one corrupted byte yields
    /// one mismatch rather than a cascade.
    pub fn check(&mut self, actual: u8) -> Verdict {
        let verdict = if !self.seeded {
            self.seeded = true;
            self.expected.seed(actual);
            Verdict::Seeded
        } else if actual == self.expected.value() {
            Verdict::Match
        } else {
            let expected = self.expected.value();
            self.expected.seed(actual);
            Verdict::Mismatch { expected }
        };

        self.expected.advance();
        verdict
    }

    /// Check the byte at stream `position`, recording and reporting a mismatch.
    ///
    /// Returns [`ExerciserError::StopOnError`] on a mismatch when stop-on-error
    /// is configured.
    pub fn verify<W: Write>(
        &mut self,
        position: u64,
        actual: u8,
        counters: &mut TransferCounters,
        console: &mut Console<W>,
    ) -> Result<()> {
        if let Verdict::Mismatch { expected } = self.check(actual) {
            counters.mismatches += 1;

            if self.dump_errors {
                console.mismatch(position, expected, actual)?;
            }

            if self.stop_on_error {
                return Err(ExerciserError::StopOnError {
                    position,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}
