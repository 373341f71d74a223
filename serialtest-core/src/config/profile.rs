//! Test profile file
//!
//! A profile describes one exerciser run: which port, how the line is set up,
//! how the loop behaves and what gets reported. Every field has a default so a
//! file only needs the settings that differ.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::loop_config::LoopConfig;
use crate::sequence::WrapMode;
use crate::{ExerciserError, Result};

/// Parity bit setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    /// Stick parity, always 1
    Mark,
    /// Stick parity, always 0
    Space,
}

impl std::str::FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            other => Err(format!(
                "Invalid parity '{}'. Valid options: none, odd, even, mark, space",
                other
            )),
        }
    }
}

/// Receive dump format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RxDump {
    /// `"<n> bytes: xx xx ..."` per read
    Hex,
    /// Received bytes echoed as-is
    Ascii,
}

impl std::str::FromStr for RxDump {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Anything but "ascii" dumps hex, matching the classic tool
        if s.eq_ignore_ascii_case("ascii") {
            Ok(RxDump::Ascii)
        } else {
            Ok(RxDump::Hex)
        }
    }
}

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortSettings {
    /// Device path, e.g. `/dev/ttyS0`
    pub path: Option<String>,
    /// Baud rate
    pub baud: u32,
    /// Parity bit
    pub parity: Parity,
    /// Two stop bits per character instead of one
    pub two_stop_bits: bool,
    /// RTS/CTS hardware flow control
    pub rts_cts: bool,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            path: None,
            baud: 115_200,
            parity: Parity::None,
            two_stop_bits: false,
            rts_cts: false,
        }
    }
}

/// Loop behaviour. Zero durations and counts mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub no_rx: bool,
    pub no_tx: bool,
    pub rx_delay_ms: u64,
    pub tx_delay_ms: u64,
    pub tx_bytes: usize,
    pub rx_timeout_ms: u64,
    pub tx_time_secs: u64,
    pub rx_time_secs: u64,
    pub write_follows_read: bool,
    pub stop_on_error: bool,
    pub dump_errors: bool,
    pub ascii: bool,
}

/// What the console reporter prints besides the mandatory lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Periodic statistics
    pub stats: bool,
    /// Dump received data
    pub rx_dump: Option<RxDump>,
    /// Print the size of every write
    pub tx_detailed: bool,
    /// ANSI colours
    pub color: bool,
}

/// Complete description of one run, as stored in `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestProfile {
    pub port: PortSettings,
    pub run: RunSettings,
    pub output: OutputSettings,
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn secs(s: u64) -> Option<Duration> {
    (s > 0).then(|| Duration::from_secs(s))
}

impl TestProfile {
    /// Parse a profile from TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the profile to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ExerciserError::Config(e.to_string()))
    }

    /// Load a profile file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExerciserError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Loop parameters for this profile
    pub fn loop_config(&self) -> LoopConfig {
        let run = &self.run;
        LoopConfig {
            rx_enabled: !run.no_rx,
            tx_enabled: !run.no_tx,
            rx_delay: millis(run.rx_delay_ms),
            tx_delay: millis(run.tx_delay_ms),
            tx_bytes: (run.tx_bytes > 0).then_some(run.tx_bytes),
            rx_timeout: millis(run.rx_timeout_ms),
            tx_time: secs(run.tx_time_secs),
            rx_time: secs(run.rx_time_secs),
            write_follows_read: run.write_follows_read,
            stop_on_error: run.stop_on_error,
            dump_errors: run.dump_errors,
            stats: self.output.stats,
            wrap: if run.ascii {
                WrapMode::Ascii
            } else {
                WrapMode::Full
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_profile_uses_defaults() {
        let profile = TestProfile::from_toml("").unwrap();
        assert_eq!(profile, TestProfile::default());
        assert_eq!(profile.port.baud, 115_200);
        assert_eq!(profile.loop_config(), LoopConfig::default());
    }

    #[test]
    fn test_profile_deserialization() {
        let toml_str = r#"
            [port]
            path = "/dev/ttyUSB1"
            baud = 921600
            parity = "even"
            two_stop_bits = true
            rts_cts = true

            [run]
            no_rx = false
            tx_delay_ms = 20
            tx_bytes = 64
            rx_timeout_ms = 500
            tx_time_secs = 10
            rx_time_secs = 12
            write_follows_read = true
            ascii = true

            [output]
            stats = true
            rx_dump = "ascii"
        "#;

        let profile = TestProfile::from_toml(toml_str).unwrap();
        assert_eq!(profile.port.path.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(profile.port.baud, 921_600);
        assert_eq!(profile.port.parity, Parity::Even);
        assert!(profile.port.two_stop_bits);
        assert_eq!(profile.output.rx_dump, Some(RxDump::Ascii));

        let config = profile.loop_config();
        assert!(config.rx_enabled);
        assert!(config.tx_enabled);
        assert_eq!(config.tx_delay, Some(Duration::from_millis(20)));
        assert_eq!(config.rx_delay, None);
        assert_eq!(config.tx_bytes, Some(64));
        assert_eq!(config.rx_timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.tx_time, Some(Duration::from_secs(10)));
        assert_eq!(config.rx_time, Some(Duration::from_secs(12)));
        assert!(config.write_follows_read);
        assert!(config.stats);
        assert_eq!(config.wrap, WrapMode::Ascii);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profile_roundtrip_through_toml() {
        let mut profile = TestProfile::default();
        profile.port.path = Some("/dev/ttyS0".to_string());
        profile.run.no_tx = true;
        profile.output.rx_dump = Some(RxDump::Hex);

        let text = profile.to_toml().unwrap();
        assert!(text.contains("[port]"));
        assert!(text.contains("[run]"));
        assert_eq!(TestProfile::from_toml(&text).unwrap(), profile);
    }

    #[test]
    fn test_invalid_parity_rejected() {
        let result = TestProfile::from_toml("[port]\nparity = \"sideways\"\n");
        assert!(matches!(result, Err(ExerciserError::Config(_))));
    }

    #[test]
    fn test_parity_from_str() {
        assert_eq!("ODD".parse::<Parity>().unwrap(), Parity::Odd);
        assert_eq!("mark".parse::<Parity>().unwrap(), Parity::Mark);
        assert!("weird".parse::<Parity>().is_err());
    }

    #[test]
    fn test_rx_dump_from_str() {
        assert_eq!("ascii".parse::<RxDump>().unwrap(), RxDump::Ascii);
        assert_eq!("raw".parse::<RxDump>().unwrap(), RxDump::Hex);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[run]\nno_tx = true\nstop_on_error = true").unwrap();

        let profile = TestProfile::load(file.path()).unwrap();
        let config = profile.loop_config();
        assert!(!config.tx_enabled);
        assert!(config.stop_on_error);
    }

    #[test]
    fn test_load_missing_file() {
        let result = TestProfile::load(Path::new("/nonexistent/serialtest.toml"));
        assert!(matches!(result, Err(ExerciserError::Config(_))));
    }
}
