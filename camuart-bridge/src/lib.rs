//! # Camera GPIO Serial Bridge
//!
//! This crate turns the register-based software UART of an industrial camera
//! into a byte-stream transport with conventional serial-port semantics.
//!
//! ## Overview
//!
//! The camera firmware exposes the UART as an asynchronous, register-based,
//! single-outstanding-transfer interface: stage bytes in a bounded transfer
//! buffer, write a length register, trigger a transmit action, poll a FIFO
//! status bit; receiving mirrors this with a receive action and a readout of
//! the same buffer. Callers, however, expect a serial port: blocking and
//! non-blocking reads and writes, buffering, flush, timeouts, and line status
//! reporting. [`bridge::SerialBridge`] reconciles the two.
//!
//! ## Architecture
//!
//! - **[`bridge::SerialBridge`]**: the stateful adapter. Generic over the
//!   [`CameraDevice`](camuart_device::CameraDevice) capability surface, so it
//!   runs unchanged against an SDK binding, the loopback emulation, or a
//!   scripted test double
//! - **[`SerialPort`] Trait**: the narrow transport contract the bridge
//!   satisfies, for callers that want to stay generic over transports
//! - **[`bridge::Builder`]**: explicit construction with line mapping, frame
//!   format and timing configuration
//! - **[`wait`]**: the cooperative deadline-and-retry loop used by every
//!   wait-for-condition operation, with an injectable clock so tests can
//!   simulate elapsed time
//!
//! ## How It Works
//!
//! 1. Line mapping and frame format are applied once at construction (and may
//!    be reconfigured any time the device is open)
//! 2. `write` slices data at the hardware's maximum transfer length and
//!    stages one chunk at a time; the hardware cannot queue more than one
//!    transfer, so multi-chunk writes always block until the TX FIFO drains
//! 3. `read` and `read_until` poll the receive action, appending whatever the
//!    device delivers to a host-side input buffer, until enough bytes (or the
//!    delimiter) arrived or the deadline passed
//!
//! ## Timeout Policy
//!
//! Deliberately bimodal: read-family operations degrade to a short (possibly
//! empty) result and never fail on timeout; `flush` and `reset` treat an
//! expired deadline as a hard error, because a silently incomplete write is
//! far more dangerous than a silently short read.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use camuart_bridge::bridge::Builder;
//! use camuart_bridge::config::FrameConfig;
//!
//! let mut port = Builder::new()
//!     .rx_source("Line2")
//!     .tx_sink("Line3")
//!     .frame(FrameConfig::new(115200, 8, "N".parse()?, 1))
//!     .build(device)?;
//!
//! port.write(b"AT\r\n", true)?;
//! let reply = port.read_until(b"\n", None)?;
//! ```
//!
//! ## Error Handling
//!
//! All failures surface as [`error::SerialError`]. Configuration errors carry
//! the rejected value and, where available, the device's own rejection text.
//! Read-path timeouts are not errors.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see:
//! - Line and frame configuration steps
//! - Transferred payloads (trace level)
//! - The forced-blocking override on multi-chunk writes
//!
//! ## Thread Model
//!
//! Single-threaded by design: every operation runs to completion (or
//! timeout) on the calling thread. There is no background poller and no
//! asynchronous notification path from the device. Callers that need
//! concurrent read and write must add their own synchronization.

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod error;
pub mod wait;

pub use bridge::{Builder, SerialBridge, StatusFlag};
pub use config::{FrameConfig, LineMapping, Parity};
pub use error::SerialError;

/// The narrow serial transport contract satisfied by
/// [`SerialBridge`](bridge::SerialBridge).
///
/// Callers that only need a generic byte transport should depend on this
/// trait instead of the concrete bridge. `write` blocks until the data has
/// left the TX FIFO; use the inherent bridge methods for non-blocking sends.
pub trait SerialPort {
    /// Ensure the underlying device is open and the port is configured.
    fn open(&mut self) -> Result<(), SerialError>;

    /// Close the port. The underlying device stays open; it usually outlives
    /// the port.
    fn close(&mut self) -> Result<(), SerialError>;

    /// Read exactly `size` bytes, or fewer if the timeout elapses first.
    fn read(&mut self, size: usize) -> Result<Vec<u8>, SerialError>;

    /// Read up to a delimiter (consumed, not returned), a size cap, or the
    /// timeout, whichever comes first.
    fn read_until(&mut self, expected: &[u8], size: Option<usize>)
    -> Result<Vec<u8>, SerialError>;

    /// Write all of `data`, blocking until transmission is complete.
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError>;

    /// Block until the TX FIFO reports empty.
    fn flush(&mut self) -> Result<(), SerialError>;

    /// Discard buffered input on the host and drain pending bytes on the
    /// device.
    fn reset_input_buffer(&mut self) -> Result<(), SerialError>;

    /// Drain the device-side output; there is no host-side output buffer.
    fn reset_output_buffer(&mut self) -> Result<(), SerialError>;

    /// Number of buffered input bytes, after pulling anything pending from
    /// the device.
    fn in_waiting(&mut self) -> Result<usize, SerialError>;

    /// 1 while the TX FIFO still holds data, else 0. The hardware exposes no
    /// exact count; treat this as a boolean signal.
    fn out_waiting(&mut self) -> Result<usize, SerialError>;

    /// Drive or release the TX break condition.
    fn set_break(&mut self, on: bool) -> Result<(), SerialError>;
}
