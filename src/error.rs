//! Error types for the thermal head tracker.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// The thermal sensor returned a packet of the wrong size
    #[error("Sensor read failure: got {bytes_read} bytes, expected {expected}")]
    SensorRead {
        /// Number of bytes actually delivered
        bytes_read: usize,
        /// Number of bytes a complete packet holds
        expected: usize,
    },

    /// The packet error code did not match the payload
    #[error("Sensor packet checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum {
        /// Checksum computed over the payload
        expected: u8,
        /// Checksum byte carried in the packet
        actual: u8,
    },

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Servo actuator rejected a command
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Whether the host loop must shut down after this error
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SensorRead { .. } | Self::Checksum { .. } | Self::Actuator(_))
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
