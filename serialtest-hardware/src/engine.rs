//! Transfer engine
//!
//! One read attempt and one write attempt per loop iteration. Outgoing data
//! comes from the transmit counter, incoming data goes through the verifier.

use crate::channel::{is_would_block, Channel};
use crate::console::Console;
use crate::verifier::Verifier;
use serialtest_core::{ExerciserError, LoopConfig, Result, RunningCounter, TransferCounters};
use std::io::Write;
use tracing::{error, warn};

/// Attempts per iteration when writes fail hard and no fixed chunk is set
pub const MAX_WRITE_RETRIES: usize = 8;

/// Moves bytes between the sequence generator, the channel and the verifier
#[derive(Debug)]
pub struct TransferEngine {
    tx: RunningCounter,
    verifier: Verifier,
    write_buf: Vec<u8>,
    read_buf: Vec<u8>,
    repeat_writes: bool,
    write_follows_read: bool,
}

impl TransferEngine {
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            tx: RunningCounter::new(config.wrap),
            verifier: Verifier::new(config),
            write_buf: vec![0; config.chunk_size()],
            read_buf: vec![0; config.read_buffer_len()],
            repeat_writes: config.repeat_writes(),
            write_follows_read: config.write_follows_read,
        }
    }

    /// First byte of the next write
    pub fn next_tx_value(&self) -> u8 {
        self.tx.value()
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Bytes the next write attempt will offer
    pub fn write_size(&self, counters: &TransferCounters) -> usize {
        let chunk = self.write_buf.len();
        if self.write_follows_read {
            counters.read_surplus().min(chunk as u64) as usize
        } else {
            chunk
        }
    }

    /// Read once and verify what arrived.
    ///
    /// Would-block reads return 0. Any other read failure is fatal.
    pub fn read<C, W>(
        &mut self,
        channel: &mut C,
        counters: &mut TransferCounters,
        console: &mut Console<W>,
    ) -> Result<usize>
    where
        C: Channel + ?Sized,
        W: Write,
    {
        let count = match channel.try_read(&mut self.read_buf) {
            Ok(count) => count,
            Err(e) if is_would_block(&e) => return Ok(0),
            Err(e) => {
                error!("Read from {} failed: {}", channel.name(), e);
                return Err(ExerciserError::Read(e));
            }
        };

        if count == 0 {
            return Ok(0);
        }

        let data = &self.read_buf[..count];
        console.rx_data(data)?;

        let base = counters.bytes_read;
        counters.bytes_read += count as u64;

        for (offset, &byte) in data.iter().enumerate() {
            self.verifier
                .verify(base + offset as u64, byte, counters, console)?;
        }

        Ok(count)
    }

    /// Fill the write buffer from the sequence and write once.
    ///
    /// The transmit counter always ends up on the first byte the channel did
    /// not accept, so partial and rejected writes neither skip nor repeat
    /// sequence values. Hard write failures are reported and count as zero
    /// bytes written.
    pub fn write<C, W>(
        &mut self,
        channel: &mut C,
        counters: &mut TransferCounters,
        console: &mut Console<W>,
    ) -> Result<usize>
    where
        C: Channel + ?Sized,
        W: Write,
    {
        let mut sent = 0;
        let mut attempts = 0;

        loop {
            let size = self.write_size(counters);
            if size == 0 {
                break;
            }

            let buf = &mut self.write_buf[..size];
            self.tx.fill(buf);
            attempts += 1;

            match channel.try_write(buf) {
                Ok(accepted) => {
                    let accepted = accepted.min(size);
                    if accepted < size {
                        self.tx.seed(buf[accepted]);
                    }
                    sent += accepted;
                    break;
                }
                Err(e) if is_would_block(&e) => {
                    self.tx.seed(buf[0]);
                    break;
                }
                Err(e) => {
                    self.tx.seed(buf[0]);
                    warn!("Write to {} failed: {}", channel.name(), e);
                    console.write_failed(&e)?;
                    if !self.repeat_writes || attempts >= MAX_WRITE_RETRIES {
                        break;
                    }
                }
            }
        }

        counters.bytes_written += sent as u64;
        console.wrote(sent)?;
        Ok(sent)
    }
}
