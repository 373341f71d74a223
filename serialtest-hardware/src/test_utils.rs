//! Scripted channel for exercising the loop without hardware

use crate::channel::Channel;
use async_trait::async_trait;
use serialtest_core::{Interest, Readiness};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tokio::time::Instant;

/// Scripted result of one `try_write` call
#[derive(Debug, Clone, Copy)]
pub enum WriteResponse {
    /// Accept at most this many bytes
    Accept(usize),
    WouldBlock,
    Fail(io::ErrorKind),
}

/// In-memory duplex channel.
///
/// Every readiness poll takes `tick` of (virtual) time, so loop tests run
/// under a paused tokio clock without spinning.
pub struct MockChannel {
    /// Bytes waiting to be read
    pub inbound: VecDeque<u8>,
    /// Bytes the channel accepted
    pub outbound: Vec<u8>,
    /// Accepted bytes are queued back as inbound data
    pub loopback: bool,
    /// Flip the byte at this outbound index on its way back
    pub corrupt_at: Option<usize>,
    /// Whether polls report the channel writable
    pub writable: bool,
    pub tick: Duration,
    pub polls: usize,
    pub write_calls: usize,
    pub first_write_at: Option<Instant>,
    /// When each read that returned data happened
    pub read_times: Vec<Instant>,
    pub drained: bool,
    pub restored: bool,
    write_script: VecDeque<WriteResponse>,
    read_error: Option<io::ErrorKind>,
    poll_error: Option<io::ErrorKind>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            loopback: false,
            corrupt_at: None,
            writable: true,
            tick: Duration::from_millis(10),
            polls: 0,
            write_calls: 0,
            first_write_at: None,
            read_times: Vec::new(),
            drained: false,
            restored: false,
            write_script: VecDeque::new(),
            read_error: None,
            poll_error: None,
        }
    }

    /// Channel that echoes everything written
    pub fn loopback() -> Self {
        Self {
            loopback: true,
            ..Self::new()
        }
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Script the next `try_write`; unscripted writes accept everything
    pub fn queue_write(&mut self, response: WriteResponse) {
        self.write_script.push_back(response);
    }

    pub fn pending_writes(&self) -> usize {
        self.write_script.len()
    }

    /// Make the next read fail with `kind`
    pub fn fail_reads(&mut self, kind: io::ErrorKind) {
        self.read_error = Some(kind);
    }

    /// Make the next poll fail with `kind`
    pub fn fail_polls(&mut self, kind: io::ErrorKind) {
        self.poll_error = Some(kind);
    }

    fn accept(&mut self, bytes: &[u8]) {
        if self.first_write_at.is_none() {
            self.first_write_at = Some(Instant::now());
        }

        for &byte in bytes {
            let index = self.outbound.len();
            self.outbound.push(byte);
            if self.loopback {
                let echoed = if self.corrupt_at == Some(index) {
                    !byte
                } else {
                    byte
                };
                self.inbound.push_back(echoed);
            }
        }
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn ready(&mut self, interest: Interest, timeout: Duration) -> io::Result<Readiness> {
        self.polls += 1;
        if let Some(kind) = self.poll_error.take() {
            return Err(io::Error::from(kind));
        }

        tokio::time::sleep(self.tick.min(timeout)).await;

        Ok(Readiness {
            readable: interest.read && (!self.inbound.is_empty() || self.read_error.is_some()),
            writable: interest.write && self.writable,
        })
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.read_error.take() {
            return Err(io::Error::from(kind));
        }
        if self.inbound.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }

        let count = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..count)) {
            *slot = byte;
        }
        self.read_times.push(Instant::now());
        Ok(count)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_calls += 1;
        if !self.writable {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }

        match self
            .write_script
            .pop_front()
            .unwrap_or(WriteResponse::Accept(usize::MAX))
        {
            WriteResponse::Accept(limit) => {
                let count = limit.min(buf.len());
                self.accept(&buf[..count]);
                Ok(count)
            }
            WriteResponse::WouldBlock => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            WriteResponse::Fail(kind) => Err(io::Error::from(kind)),
        }
    }

    async fn drain(&mut self) -> io::Result<()> {
        self.drained = true;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        self.restored = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
