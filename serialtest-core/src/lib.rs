//! serialtest core library
//!
//! Shared types for the serial line exerciser: the byte sequence generator,
//! transfer counters, loop configuration, errors and exit status computation.
//! Nothing here touches a device; see `serialtest-hardware` for the loop.

pub mod config;
pub mod error;
pub mod sequence;
pub mod status;
pub mod types;

// Re-export commonly used types
pub use config::{
    default_config_path, LoopConfig, OutputSettings, Parity, PortSettings, RunSettings, RxDump,
    TestProfile, CONFIG_ENV_VAR, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};
pub use error::*;
pub use sequence::{RunningCounter, WrapMode};
pub use status::{RunSummary, EXIT_NOTHING_HAPPENED, EXIT_STATUS_CAP};
pub use types::*;
