//! # Serial Communication Module
//!
//! Handles serial communication with the multi-protocol RF module.
//!
//! This module handles:
//! - Opening the serial port at 100,000 baud, 8E2
//! - Queueing encoded frames without blocking the pulse tick
//! - Writing queued frames to the port

pub mod port_trait;
pub mod writer;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{MultiBridgeError, Result};
use port_trait::SerialPortIO;

/// Multi module serial baud rate (100,000 baud, 8E2)
pub const MULTI_BAUD_RATE: u32 = 100_000;

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Multi Module Serial Port Handler
///
/// Manages the serial connection to the module.
pub struct MultiSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for MultiSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl MultiSerial {
    /// Open connection to the module
    ///
    /// Tries the configured port first, then the common device paths.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use multi_bridge::serial::MultiSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = MultiSerial::open("/dev/ttyUSB0", 100_000, 100)?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open(port: &str, baud_rate: u32, timeout_ms: u64) -> Result<Self> {
        let mut paths = vec![port];
        paths.extend(DEFAULT_DEVICE_PATHS.iter().copied().filter(|p| *p != port));
        Self::open_with_paths(&paths, baud_rate, timeout_ms)
    }

    /// Open connection to the module with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    /// * `timeout_ms` - Port I/O timeout
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout_ms: u64) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout_ms) {
                Ok(port) => {
                    info!("Successfully opened multi module at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(MultiBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with the module's line settings
    fn open_port(path: &str, baud_rate: u32, timeout_ms: u64) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::Even)
            .stop_bits(tokio_serial::StopBits::Two)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::from_millis(timeout_ms))
            .open_native_async()
            .map_err(|e| MultiBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for MultiSerial {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
