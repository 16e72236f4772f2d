//! # Camera Serial Capability Surface
//!
//! This crate defines the capability surface that camera firmware exposes for
//! its serial (software UART over GPIO) register block, decoupled from any
//! concrete vendor SDK binding.
//!
//! ## Overview
//!
//! Industrial cameras expose a software UART on their opto-isolated I/O
//! lines. The firmware does not present a byte stream: it presents a set of
//! named **feature nodes** (typed registers with optional maxima and symbolic
//! enumerations), fire-and-forget **execute actions**, and one bounded
//! **transfer buffer** shared by both directions. This crate models exactly
//! that surface:
//!
//! - **[`CameraDevice`] Trait**: the interface a device binding (or a test
//!   double) must implement so that a bridge can drive the serial block
//! - **[`FeatureValue`]**: the three value types a feature node can carry
//!   (enumerated symbolic, integer, boolean)
//! - **[`nodes`]**: the canonical node and action names of the serial block
//! - **[`DeviceError`]**: rejection and failure conditions of node access
//!
//! ## How It Works
//!
//! 1. A backend (SDK binding, loopback emulation, scripted fake) implements
//!    the [`CameraDevice`] trait
//! 2. A bridge such as `camuart-bridge`'s `SerialBridge` drives the node and
//!    action names from [`nodes`] against that backend
//! 3. Rejections surface as [`DeviceError::InvalidArgument`] carrying the
//!    device's own reason text, so callers can tell a bad parameter from an
//!    internal failure
//!
//! ## Thread Safety
//!
//! The trait is deliberately `&mut self` on every mutating operation: the
//! hardware supports a single in-flight transfer per direction and the
//! register block is shared mutable state. Callers that need concurrent
//! access must add their own synchronization.

pub mod error;
pub mod feature;
pub mod nodes;

pub use error::DeviceError;
pub use feature::{FeatureValue, Transport};

/// Trait that device backends must implement to expose the serial register
/// block.
///
/// This is the seam between the serial bridge and the actual camera access
/// layer. Implementors translate node reads/writes and action triggers into
/// whatever their transport requires; the bridge never touches anything but
/// this trait.
///
/// See the [`camuart-loopback`](https://docs.rs/camuart-loopback/) crate for
/// an in-memory reference implementation.
pub trait CameraDevice {
    /// Whether the device connection is currently open.
    fn is_open(&self) -> bool;

    /// Open the device connection. Opening an already open device is a no-op.
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Close the device connection.
    fn close(&mut self) -> Result<(), DeviceError>;

    /// The transport the device is reachable over.
    ///
    /// Bridges need this for transport-specific register access rules; see
    /// [`Transport::is_gige`].
    fn transport(&self) -> Transport;

    /// Read the current value of a feature node.
    fn value(&self, node: &str) -> Result<FeatureValue, DeviceError>;

    /// Write a feature node.
    ///
    /// # Error Handling
    ///
    /// A value the device cannot accept (unknown symbolic, out of range,
    /// unsupported for the current selector state) must be rejected with
    /// [`DeviceError::InvalidArgument`] and a reason text; the node keeps its
    /// previous value.
    fn set_value(&mut self, node: &str, value: FeatureValue) -> Result<(), DeviceError>;

    /// The symbolic entries of an enumerated feature node.
    fn symbolics(&self, node: &str) -> Result<Vec<String>, DeviceError>;

    /// The maximum of a bounded integer feature node.
    fn max(&self, node: &str) -> Result<i64, DeviceError>;

    /// Trigger an execute action by name. No return payload beyond
    /// success or failure.
    fn execute(&mut self, action: &str) -> Result<(), DeviceError>;

    /// Bulk read of the transfer buffer. Always returns the full buffer;
    /// callers slice it by the transfer-length register.
    fn buffer(&self) -> Result<Vec<u8>, DeviceError>;

    /// Bulk write of the transfer buffer.
    ///
    /// `data` must not exceed [`CameraDevice::buffer_capacity`]. Transports
    /// may impose additional access rules (GigE accepts whole 32-bit words
    /// only); violations are reported as [`DeviceError::Hardware`].
    fn set_buffer(&mut self, data: &[u8]) -> Result<(), DeviceError>;

    /// Size of the transfer buffer in bytes.
    fn buffer_capacity(&self) -> Result<usize, DeviceError>;
}
