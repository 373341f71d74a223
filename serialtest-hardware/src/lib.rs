//! serialtest-hardware
//!
//! Serial channel plus the transmit/receive exerciser loop that runs over it.
//!
//! Public API:
//! - `session::Session`: drives one run and produces its summary
//! - `serial_channel::SerialChannel`: the real tty behind the `Channel` seam
//! - `console::Console`: user-facing output of a run
//! - `serial_channel::list_ports`: enumerate serial ports

pub mod channel;
pub mod console;
pub mod engine;
pub mod health;
pub mod serial_channel;
pub mod session;
pub mod verifier;

#[cfg(test)]
pub mod test_utils;

pub use channel::Channel;
pub use console::Console;
pub use health::{HealthMonitor, Stall};
pub use serial_channel::{list_ports, PortListing, SerialChannel};
pub use session::Session;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_present() {
        let _ = std::any::TypeId::of::<SerialChannel>();
        let _ = std::any::TypeId::of::<Session<SerialChannel, Vec<u8>>>();
    }
}
