//! Configuration types for the exerciser
//!
//! Configuration is split into:
//! - [`LoopConfig`] - immutable parameters of the transmit/receive loop
//! - [`TestProfile`] - the TOML file form, with port, run and output sections
//!
//! The binary layers a profile file, environment and command-line flags into
//! a [`TestProfile`] and derives the [`LoopConfig`] from it.

mod loop_config;
mod paths;
mod profile;

pub use loop_config::{LoopConfig, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
pub use paths::{default_config_path, CONFIG_ENV_VAR};
pub use profile::{OutputSettings, Parity, PortSettings, RunSettings, RxDump, TestProfile};
