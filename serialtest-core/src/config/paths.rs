//! Default path resolution for configuration files

use std::path::PathBuf;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "SERIALTEST_CONFIG";

/// Returns the default path for the test profile file.
///
/// Uses XDG config directory if available:
/// - Linux/macOS: `~/.config/serialtest/config.toml`
/// - Fallback: `/etc/serialtest/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("serialtest")
        .join("config.toml")
}
