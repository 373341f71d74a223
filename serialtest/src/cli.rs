//! Command-line arguments

use clap::Parser;
use serialtest_core::{Parity, RxDump};
use std::path::PathBuf;

/// Parse an integer the way C's `strtol(.., 0)` does: `0x` hex, leading-zero
/// octal, decimal otherwise
fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    u64::from_str_radix(digits, radix).map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let value = parse_number(s)?;
    u8::try_from(value).map_err(|_| format!("byte value {} out of range 0-255", value))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_number(s)?;
    u32::try_from(value).map_err(|_| format!("value {} too large", value))
}

fn parse_usize(s: &str) -> Result<usize, String> {
    let value = parse_number(s)?;
    usize::try_from(value).map_err(|_| format!("value {} too large", value))
}

/// Serial line exerciser
///
/// Streams an incrementing byte sequence over a serial port and verifies the
/// sequence coming back. The exit status is 0 when everything matched.
#[derive(Parser, Debug)]
#[command(name = "serialtest")]
#[command(version, about = "Serial line exerciser", long_about = None)]
pub struct Args {
    /// Serial port device, e.g. /dev/ttyS0
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (default 115200)
    #[arg(short, long, value_parser = parse_u32)]
    pub baud: Option<u32>,

    /// Dump received data as hex, or raw with "ascii"
    #[arg(short = 'R', long)]
    pub rx_dump: Option<RxDump>,

    /// Print the number of bytes accepted by every write
    #[arg(short = 'T', long)]
    pub detailed_tx: bool,

    /// Print statistics every two seconds
    #[arg(short, long)]
    pub stats: bool,

    /// Stop on the first transfer error
    #[arg(short = 'S', long = "stop-on-err")]
    pub stop_on_error: bool,

    /// Send this byte and exit
    #[arg(short = 'y', long, value_parser = parse_byte)]
    pub single_byte: Option<u8>,

    /// With --single-byte, send this byte after it
    #[arg(short = 'z', long, value_parser = parse_byte, requires = "single_byte")]
    pub second_byte: Option<u8>,

    /// Enable RTS/CTS flow control
    #[arg(short = 'c', long)]
    pub rts_cts: bool,

    /// Use two stop bits per character
    #[arg(short = 'B', long = "2-stop-bit")]
    pub two_stop_bits: bool,

    /// Parity: none, odd, even, mark or space
    #[arg(short = 'P', long)]
    pub parity: Option<Parity>,

    /// Only write as many bytes as have been read
    #[arg(short = 'K', long = "write-follows")]
    pub write_follows_read: bool,

    /// Print every received byte that breaks the sequence
    #[arg(short = 'e', long = "dump-err")]
    pub dump_errors: bool,

    /// Don't receive data
    #[arg(short = 'r', long)]
    pub no_rx: bool,

    /// Don't transmit data
    #[arg(short = 't', long)]
    pub no_tx: bool,

    /// Minimum milliseconds between reads
    #[arg(short = 'l', long, value_name = "MS", value_parser = parse_number)]
    pub rx_delay: Option<u64>,

    /// Minimum milliseconds between writes
    #[arg(short = 'a', long, value_name = "MS", value_parser = parse_number)]
    pub tx_delay: Option<u64>,

    /// Bytes per write (default: a 1024 byte chunk)
    #[arg(short = 'w', long, value_name = "N", value_parser = parse_usize)]
    pub tx_bytes: Option<usize>,

    /// Stop transmitting after this many seconds
    #[arg(short = 'o', long, value_name = "SECS", value_parser = parse_number)]
    pub tx_time: Option<u64>,

    /// Stop receiving after this many seconds
    #[arg(short = 'i', long, value_name = "SECS", value_parser = parse_number)]
    pub rx_time: Option<u64>,

    /// Send printable ASCII characters only
    #[arg(short = 'A', long)]
    pub ascii: bool,

    /// Hold writes until no data has been received for this many
    /// milliseconds; needs --tx-delay
    #[arg(short = 'x', long, value_name = "MS", value_parser = parse_number)]
    pub rx_timeout: Option<u64>,

    /// Colourise statistics and errors
    #[arg(short = 'C', long)]
    pub color: bool,

    /// Profile file (default: ~/.config/serialtest/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Don't load a profile file
    #[arg(long)]
    pub no_config: bool,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_arguments() {
        let args = Args::try_parse_from(["serialtest", "-p", "/dev/ttyS0"]).unwrap();
        assert_eq!(args.port.as_deref(), Some("/dev/ttyS0"));
        assert_eq!(args.baud, None);
        assert!(!args.no_rx);
        assert!(!args.stats);
        assert!(args.single_byte.is_none());
    }

    #[test]
    fn test_short_flags() {
        let args = Args::try_parse_from([
            "serialtest", "-p", "/dev/ttyUSB0", "-b", "921600", "-s", "-S", "-e", "-A", "-B",
            "-c", "-K", "-T", "-C", "-w", "64", "-a", "10", "-x", "200", "-o", "5", "-i", "7",
            "-P", "odd", "-R", "ascii",
        ])
        .unwrap();

        assert_eq!(args.baud, Some(921_600));
        assert!(args.stats && args.stop_on_error && args.dump_errors && args.ascii);
        assert!(args.two_stop_bits && args.rts_cts && args.write_follows_read);
        assert!(args.detailed_tx && args.color);
        assert_eq!(args.tx_bytes, Some(64));
        assert_eq!(args.tx_delay, Some(10));
        assert_eq!(args.rx_timeout, Some(200));
        assert_eq!(args.tx_time, Some(5));
        assert_eq!(args.rx_time, Some(7));
        assert_eq!(args.parity, Some(Parity::Odd));
        assert_eq!(args.rx_dump, Some(RxDump::Ascii));
    }

    #[test]
    fn test_long_flags() {
        let args = Args::try_parse_from([
            "serialtest",
            "--port",
            "/dev/ttyS1",
            "--no-rx",
            "--stop-on-err",
            "--2-stop-bit",
            "--write-follows",
            "--dump-err",
            "--rx-delay",
            "5",
            "--rx-dump",
            "hex",
        ])
        .unwrap();

        assert!(args.no_rx);
        assert!(args.stop_on_error);
        assert!(args.two_stop_bits);
        assert!(args.write_follows_read);
        assert!(args.dump_errors);
        assert_eq!(args.rx_delay, Some(5));
        assert_eq!(args.rx_dump, Some(RxDump::Hex));
    }

    #[test]
    fn test_single_byte_accepts_hex() {
        let args =
            Args::try_parse_from(["serialtest", "-p", "/dev/ttyS0", "-y", "0x55", "-z", "170"])
                .unwrap();
        assert_eq!(args.single_byte, Some(0x55));
        assert_eq!(args.second_byte, Some(0xaa));
    }

    #[test]
    fn test_second_byte_requires_first() {
        assert!(Args::try_parse_from(["serialtest", "-p", "/dev/ttyS0", "-z", "1"]).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Args::try_parse_from(["serialtest", "-y", "256"]).is_err());
        assert!(Args::try_parse_from(["serialtest", "-b", "fast"]).is_err());
        assert!(Args::try_parse_from(["serialtest", "-P", "sideways"]).is_err());
    }

    #[test]
    fn test_parse_number_radix() {
        assert_eq!(parse_number("0x10"), Ok(16));
        assert_eq!(parse_number("010"), Ok(8));
        assert_eq!(parse_number("10"), Ok(10));
        assert_eq!(parse_number("0"), Ok(0));
        assert!(parse_number("").is_err());
        assert!(parse_number("-1").is_err());
    }
}
