//! Console reporter
//!
//! Writes the line-oriented report stream: received data dumps, write sizes,
//! mismatch diagnostics, statistics, stall warnings and state changes.
//! Diagnostics about the run itself go through `tracing` instead.

use crate::health::Stall;
use colored::*;
use serialtest_core::{bits_per_second, OutputSettings, RxDump, TransferCounters};
use std::io::{self, Write};
use std::time::Duration;

/// Report writer for one port
pub struct Console<W: Write> {
    out: W,
    port: String,
    options: OutputSettings,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, port: impl Into<String>, options: OutputSettings) -> Self {
        Self {
            out,
            port: port.into(),
            options,
        }
    }

    /// The underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn info(&self, text: String) -> String {
        if self.options.color {
            text.green().to_string()
        } else {
            text
        }
    }

    fn alert(&self, text: String) -> String {
        if self.options.color {
            text.red().bold().to_string()
        } else {
            text
        }
    }

    /// Dump one read's worth of received data, if enabled
    pub fn rx_data(&mut self, data: &[u8]) -> io::Result<()> {
        match self.options.rx_dump {
            None => Ok(()),
            Some(RxDump::Ascii) => self.out.write_all(data),
            Some(RxDump::Hex) => {
                write!(self.out, "{} bytes: ", data.len())?;
                for byte in data {
                    write!(self.out, "{:02x} ", byte)?;
                }
                writeln!(self.out)
            }
        }
    }

    /// Report a write that moved at least one byte, if enabled
    pub fn wrote(&mut self, count: usize) -> io::Result<()> {
        if self.options.tx_detailed && count > 0 {
            writeln!(self.out, "wrote {} bytes", count)?;
        }
        Ok(())
    }

    /// Report a write that failed with something other than would-block
    pub fn write_failed(&mut self, err: &io::Error) -> io::Result<()> {
        match err.raw_os_error() {
            Some(errno) => writeln!(self.out, "write failed - errno={} ({})", errno, err),
            None => writeln!(self.out, "write failed - {}", err),
        }
    }

    /// Report a received byte that diverged from the sequence
    pub fn mismatch(&mut self, position: u64, expected: u8, actual: u8) -> io::Result<()> {
        let line = self.alert(format!(
            "Error, count: {}, expected {:02x}, got {:02x}",
            position, expected, actual
        ));
        writeln!(self.out, "{}", line)
    }

    /// Statistics line: elapsed time, both byte counts with bit rates, error count
    pub fn stats(&mut self, elapsed: Duration, counters: &TransferCounters) -> io::Result<()> {
        let elapsed_ms = elapsed.as_millis() as u64;
        let body = self.info(format!(
            "{}{}: t={}s, rx={} ({} bits/s), tx={} ({} bits/s), rx err=",
            if self.options.rx_dump.is_some() { "\n" } else { "" },
            self.port,
            elapsed_ms / 1000,
            counters.bytes_read,
            bits_per_second(counters.bytes_read, elapsed_ms),
            counters.bytes_written,
            bits_per_second(counters.bytes_written, elapsed_ms),
        ));
        let errors = if counters.mismatches > 0 {
            self.alert(counters.mismatches.to_string())
        } else {
            self.info(counters.mismatches.to_string())
        };
        writeln!(self.out, "{}{}", body, errors)
    }

    /// Stall warning naming whichever directions have gone quiet
    pub fn stall(&mut self, stall: &Stall) -> io::Result<()> {
        let mut parts = Vec::with_capacity(2);
        if let Some(quiet) = stall.rx {
            parts.push(format!(
                "No data received for {:.1}s.",
                quiet.as_secs_f64()
            ));
        }
        if let Some(quiet) = stall.tx {
            parts.push(format!(
                "No data transmitted for {:.1}s.",
                quiet.as_secs_f64()
            ));
        }
        writeln!(self.out, "{}: {}", self.port, parts.join(" "))
    }

    /// One-off state change such as a direction being switched off
    pub fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(options: OutputSettings) -> Console<Vec<u8>> {
        Console::new(Vec::new(), "/dev/ttyS1", options)
    }

    fn text(console: &Console<Vec<u8>>) -> String {
        String::from_utf8_lossy(console.get_ref()).into_owned()
    }

    #[test]
    fn test_hex_dump() {
        let mut c = console(OutputSettings {
            rx_dump: Some(RxDump::Hex),
            ..OutputSettings::default()
        });
        c.rx_data(&[0x00, 0x7f, 0xff]).unwrap();
        assert_eq!(text(&c), "3 bytes: 00 7f ff \n");
    }

    #[test]
    fn test_ascii_dump_is_raw() {
        let mut c = console(OutputSettings {
            rx_dump: Some(RxDump::Ascii),
            ..OutputSettings::default()
        });
        c.rx_data(b"ABC").unwrap();
        assert_eq!(text(&c), "ABC");
    }

    #[test]
    fn test_no_dump_by_default() {
        let mut c = console(OutputSettings::default());
        c.rx_data(b"ABC").unwrap();
        c.wrote(12).unwrap();
        assert!(text(&c).is_empty());
    }

    #[test]
    fn test_detailed_tx() {
        let mut c = console(OutputSettings {
            tx_detailed: true,
            ..OutputSettings::default()
        });
        c.wrote(0).unwrap();
        c.wrote(64).unwrap();
        assert_eq!(text(&c), "wrote 64 bytes\n");
    }

    #[test]
    fn test_stats_line() {
        let mut c = console(OutputSettings::default());
        let counters = TransferCounters {
            bytes_written: 2000,
            bytes_read: 1000,
            mismatches: 3,
        };
        c.stats(Duration::from_millis(2000), &counters).unwrap();
        assert_eq!(
            text(&c),
            "/dev/ttyS1: t=2s, rx=1000 (4000 bits/s), tx=2000 (8000 bits/s), rx err=3\n"
        );
    }

    #[test]
    fn test_stats_line_prefixed_when_dumping() {
        let mut c = console(OutputSettings {
            rx_dump: Some(RxDump::Ascii),
            ..OutputSettings::default()
        });
        c.stats(Duration::from_secs(1), &TransferCounters::default())
            .unwrap();
        assert!(text(&c).starts_with("\n/dev/ttyS1: t=1s"));
    }

    #[test]
    fn test_stall_lines() {
        let mut c = console(OutputSettings::default());
        c.stall(&Stall {
            rx: Some(Duration::from_millis(2300)),
            tx: Some(Duration::from_millis(4000)),
        })
        .unwrap();
        c.stall(&Stall {
            rx: None,
            tx: Some(Duration::from_millis(2040)),
        })
        .unwrap();
        assert_eq!(
            text(&c),
            "/dev/ttyS1: No data received for 2.3s. No data transmitted for 4.0s.\n\
             /dev/ttyS1: No data transmitted for 2.0s.\n"
        );
    }

    #[test]
    fn test_mismatch_line() {
        let mut c = console(OutputSettings::default());
        c.mismatch(1025, 0x01, 0x03).unwrap();
        assert_eq!(text(&c), "Error, count: 1025, expected 01, got 03\n");
    }

    #[test]
    fn test_write_failed_with_errno() {
        let mut c = console(OutputSettings::default());
        c.write_failed(&io::Error::from_raw_os_error(5)).unwrap();
        assert!(text(&c).starts_with("write failed - errno=5 ("));
    }
}
