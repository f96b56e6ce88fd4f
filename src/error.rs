//! # Error Types
//!
//! Custom error types for Multi Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Multi Bridge
#[derive(Debug, Error)]
pub enum MultiBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors (open, write, flush)
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Frame sink cannot accept another frame; the frame is dropped
    #[error("Frame sink full, frame dropped")]
    SinkFull,

    /// Frame sink receiver is gone
    #[error("Frame sink closed")]
    SinkClosed,

    /// Frame trace serialization errors
    #[error("Trace error: {0}")]
    Trace(#[from] serde_json::Error),
}

/// Result type alias for Multi Bridge
pub type Result<T> = std::result::Result<T, MultiBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(MultiBridgeError::SinkFull.to_string(), "Frame sink full, frame dropped");
        assert_eq!(MultiBridgeError::SinkClosed.to_string(), "Frame sink closed");
        assert_eq!(
            MultiBridgeError::SerialPortNotFound("/dev/ttyUSB0".into()).to_string(),
            "No serial device found (tried: /dev/ttyUSB0)"
        );
    }
}
