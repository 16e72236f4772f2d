use std::{error::Error, fmt::Display};

/// Errors that may occur when accessing the device capability surface.
#[derive(Debug)]
pub enum DeviceError {
    /// The named feature node or action does not exist on this device.
    UnknownNode(String),
    /// The device rejected a written value or a selector state.
    InvalidArgument { node: String, reason: String },
    /// The node exists but does not carry the expected value type.
    TypeMismatch {
        node: String,
        expected: &'static str,
    },
    /// The device connection is not open.
    NotOpen,
    /// The device reported an internal failure, e.g. a register write that
    /// could not be completed.
    Hardware(String),
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::UnknownNode(node) => write!(f, "Unknown feature node {}", node),
            DeviceError::InvalidArgument { node, reason } => {
                write!(f, "Invalid argument for {}: {}", node, reason)
            }
            DeviceError::TypeMismatch { node, expected } => {
                write!(f, "Feature node {} does not carry a {} value", node, expected)
            }
            DeviceError::NotOpen => write!(f, "Device is not open"),
            DeviceError::Hardware(reason) => write!(f, "Device failure: {}", reason),
        }
    }
}

impl Error for DeviceError {}
