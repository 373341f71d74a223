//! Run configuration
//!
//! Layers the sources of a [`TestProfile`] in priority order (lowest first):
//! 1. Defaults
//! 2. Profile file
//! 3. Environment variables
//! 4. Command-line arguments

use crate::cli::Args;
use anyhow::{Context, Result};
use serialtest_core::{default_config_path, ExerciserError, TestProfile, CONFIG_ENV_VAR};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the serial port
pub const PORT_ENV_VAR: &str = "SERIALTEST_PORT";

/// Environment variable holding the baud rate
pub const BAUD_ENV_VAR: &str = "SERIALTEST_BAUD";

/// Profile file to load, if any.
///
/// `--config` wins over `SERIALTEST_CONFIG`; the default location is only
/// used when the file exists.
pub fn resolve_config_path<F>(args: &Args, lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if args.no_config {
        return None;
    }
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    if let Some(path) = lookup(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let default = default_config_path();
    default.exists().then_some(default)
}

/// Builder applying the configuration priority chain
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    profile: TestProfile,
}

impl ConfigBuilder {
    /// Start from defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the defaults with a profile file
    pub fn with_config_file(mut self, path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            debug!("Loading profile {}", path.display());
            self.profile = TestProfile::load(path)
                .with_context(|| format!("Failed to load profile {}", path.display()))?;
        }
        Ok(self)
    }

    /// Apply `SERIALTEST_PORT` and `SERIALTEST_BAUD` from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV_VAR).filter(|port| !port.is_empty()) {
            self.profile.port.path = Some(port);
        }

        if let Some(baud) = lookup(BAUD_ENV_VAR) {
            match baud.trim().parse::<u32>() {
                Ok(baud) if baud > 0 => self.profile.port.baud = baud,
                _ => warn!("Ignoring invalid {}={}", BAUD_ENV_VAR, baud),
            }
        }

        self
    }

    /// Apply command-line arguments.
    ///
    /// Valued options replace what earlier layers set; switches can only turn
    /// a feature on.
    pub fn with_args(mut self, args: &Args) -> Self {
        let port = &mut self.profile.port;
        if let Some(path) = &args.port {
            port.path = Some(path.clone());
        }
        if let Some(baud) = args.baud {
            port.baud = baud;
        }
        if let Some(parity) = args.parity {
            port.parity = parity;
        }
        port.two_stop_bits |= args.two_stop_bits;
        port.rts_cts |= args.rts_cts;

        let run = &mut self.profile.run;
        run.no_rx |= args.no_rx;
        run.no_tx |= args.no_tx;
        if let Some(ms) = args.rx_delay {
            run.rx_delay_ms = ms;
        }
        if let Some(ms) = args.tx_delay {
            run.tx_delay_ms = ms;
        }
        if let Some(bytes) = args.tx_bytes {
            run.tx_bytes = bytes;
        }
        if let Some(ms) = args.rx_timeout {
            run.rx_timeout_ms = ms;
        }
        if let Some(secs) = args.tx_time {
            run.tx_time_secs = secs;
        }
        if let Some(secs) = args.rx_time {
            run.rx_time_secs = secs;
        }
        run.write_follows_read |= args.write_follows_read;
        run.stop_on_error |= args.stop_on_error;
        run.dump_errors |= args.dump_errors;
        run.ascii |= args.ascii;

        let output = &mut self.profile.output;
        output.stats |= args.stats;
        output.tx_detailed |= args.detailed_tx;
        output.color |= args.color;
        if let Some(dump) = args.rx_dump {
            output.rx_dump = Some(dump);
        }

        self
    }

    /// Validate and return the final profile
    pub fn build(self) -> Result<TestProfile> {
        let profile = self.profile;

        if profile.port.path.as_deref().map_or(true, str::is_empty) {
            return Err(ExerciserError::InvalidInput("Port argument required".to_string()).into());
        }
        if profile.port.baud == 0 {
            return Err(
                ExerciserError::InvalidInput("Baud rate must be non-zero".to_string()).into(),
            );
        }
        profile.loop_config().validate()?;

        Ok(profile)
    }
}
