//! Error types for the serial exerciser

use thiserror::Error;

/// `EIO` from `<errno.h>`, used when no OS error code is available.
pub const EIO: i32 = 5;

/// `EINVAL` from `<errno.h>`.
pub const EINVAL: i32 = 22;

/// Convert an errno value to the process status the shell observes for
/// `exit(-errno)`.
pub fn errno_status(errno: i32) -> i32 {
    (-errno) & 0xff
}

/// Core error type for exerciser operations
#[derive(Error, Debug)]
pub enum ExerciserError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serial port errors (open, configure, enumerate)
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Setting the serial backend cannot express
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Readiness poll failed; the loop cannot continue
    #[error("poll() failed: {0}")]
    Poll(std::io::Error),

    /// Read failed with something other than would-block
    #[error("read failed: {0}")]
    Read(std::io::Error),

    /// A received byte diverged from the sequence and stop-on-error is set
    #[error("Data mismatch at byte {position}: expected {expected:02x}, got {actual:02x}")]
    StopOnError {
        position: u64,
        expected: u8,
        actual: u8,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExerciserError {
    /// Process status for a run that ended with this error.
    pub fn exit_status(&self) -> i32 {
        match self {
            ExerciserError::Config(_) | ExerciserError::InvalidInput(_) => errno_status(EINVAL),
            ExerciserError::Unsupported(_) => errno_status(EINVAL),
            ExerciserError::Poll(e) | ExerciserError::Read(e) | ExerciserError::Io(e) => {
                errno_status(e.raw_os_error().unwrap_or(EIO))
            }
            ExerciserError::Serial(_) | ExerciserError::StopOnError { .. } => errno_status(EIO),
        }
    }
}

/// Result type alias for exerciser operations
pub type Result<T> = std::result::Result<T, ExerciserError>;

impl From<toml::de::Error> for ExerciserError {
    fn from(err: toml::de::Error) -> Self {
        ExerciserError::Config(err.to_string())
    }
}
