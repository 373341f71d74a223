//! Sequence generator
//!
//! The exerciser streams an implicit, continuously incrementing byte counter.
//! Transmit and receive each own a [`RunningCounter`] so a resync on one side
//! never moves the other.

use serde::{Deserialize, Serialize};

/// First printable ASCII byte (space)
pub const ASCII_FIRST: u8 = 32;

/// Last printable ASCII byte (`~`)
pub const ASCII_LAST: u8 = 126;

/// Byte range the generator cycles through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    /// 0..=255
    #[default]
    Full,
    /// 32..=126, wrapping back to 32
    Ascii,
}

impl WrapMode {
    /// Value a fresh counter starts from
    pub const fn first(self) -> u8 {
        match self {
            WrapMode::Full => 0,
            WrapMode::Ascii => ASCII_FIRST,
        }
    }

    /// Successor of `current` under this wrap mode.
    ///
    /// In ASCII mode a value outside the printable band (possible after a
    /// resync on corrupted input) still increments, and only wraps once it
    /// reaches 127 or beyond.
    #[inline]
    pub fn next(self, current: u8) -> u8 {
        let next = current.wrapping_add(1);
        match self {
            WrapMode::Ascii if next > ASCII_LAST => ASCII_FIRST,
            _ => next,
        }
    }
}

/// A wrapping byte counter positioned on the next value to produce or expect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningCounter {
    value: u8,
    mode: WrapMode,
}

impl RunningCounter {
    /// Counter at the first value of `mode`
    pub fn new(mode: WrapMode) -> Self {
        Self {
            value: mode.first(),
            mode,
        }
    }

    /// Current position
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Reposition the counter, e.g. on the first received byte or after a mismatch
    pub fn seed(&mut self, value: u8) {
        self.value = value;
    }

    /// Return the current value and move to its successor
    pub fn advance(&mut self) -> u8 {
        let current = self.value;
        self.value = self.mode.next(current);
        current
    }

    /// Fill `buf` with consecutive values, leaving the counter after the last one
    pub fn fill(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.advance();
        }
    }
}
