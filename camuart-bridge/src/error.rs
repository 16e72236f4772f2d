use std::{error::Error, fmt::Display, time::Duration};

use camuart_device::DeviceError;

use crate::bridge::StatusFlag;
use crate::config::FrameConfig;

/// Errors raised by the serial bridge.
///
/// Read-path timeouts are deliberately absent: a read that cannot be
/// satisfied in time returns a short (possibly empty) result, never an
/// error.
#[derive(Debug)]
pub enum SerialError {
    /// The requested RX source is not among the device's enumerated sources.
    UnsupportedLine { line: String, available: Vec<String> },
    /// The requested TX sink cannot be configured as serial output.
    LineNotTxCapable { line: String, reason: String },
    /// Parity outside the supported Odd/Even/None set.
    UnsupportedParity(String),
    /// The device rejected the frame format.
    FrameConfigurationRejected { frame: FrameConfig, reason: String },
    /// Payload exceeds the hardware's maximum single-transfer length; the
    /// caller must pre-slice.
    PayloadTooLarge { max: usize, got: usize },
    /// The device failed to accept the staged payload.
    TransferBufferWriteError(String),
    /// The TX FIFO did not drain within the timeout.
    FlushTimeout { waited: Duration },
    /// TX FIFO overflow was still asserted after a full reset sequence.
    ResetIncomplete,
    /// One or more status flags are set; carries the flags in report order.
    SerialLineError(Vec<StatusFlag>),
    /// Any other rejection or failure reported by the device.
    Device(DeviceError),
}

impl From<DeviceError> for SerialError {
    fn from(value: DeviceError) -> Self {
        SerialError::Device(value)
    }
}

impl Display for SerialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerialError::UnsupportedLine { line, available } => {
                write!(
                    f,
                    "RX source not supported: {} (available: {})",
                    line,
                    available.join(", ")
                )
            }
            SerialError::LineNotTxCapable { line, reason } => {
                write!(f, "Line is not usable as serial TX: {} ({})", line, reason)
            }
            SerialError::UnsupportedParity(parity) => {
                write!(
                    f,
                    "Only 'Odd', 'Even' or 'None' parity is supported, got {:?}",
                    parity
                )
            }
            SerialError::FrameConfigurationRejected { frame, reason } => {
                write!(f, "Frame configuration {} rejected: {}", frame, reason)
            }
            SerialError::PayloadTooLarge { max, got } => {
                write!(
                    f,
                    "Payload too large! Maximum is {} bytes per transfer, but got {}",
                    max, got
                )
            }
            SerialError::TransferBufferWriteError(reason) => {
                write!(f, "Error writing to transfer buffer: {}", reason)
            }
            SerialError::FlushTimeout { waited } => {
                write!(
                    f,
                    "Timed out after {:.3} seconds waiting for the TX FIFO to drain",
                    waited.as_secs_f64()
                )
            }
            SerialError::ResetIncomplete => {
                write!(f, "TX FIFO overflow still asserted after reset")
            }
            SerialError::SerialLineError(flags) => {
                let tags: Vec<&str> = flags.iter().map(|flag| flag.tag()).collect();
                write!(f, "Serial error detected: [{}]", tags.join(", "))
            }
            SerialError::Device(error) => write!(f, "{}", error),
        }
    }
}

impl Error for SerialError {}
