use std::fmt::Display;

/// The value of a feature node.
///
/// Feature nodes are typed: an enumeration carries one of its symbolic
/// entries, bounded integers carry counts and lengths, booleans carry status
/// bits and switches.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeatureValue {
    /// A symbolic entry of an enumerated node, e.g. `"Baud115200"`.
    Enumeration(String),
    /// An integer node, e.g. the transfer length register.
    Integer(i64),
    /// A boolean node, e.g. a status flag.
    Boolean(bool),
}

impl FeatureValue {
    /// The symbolic entry, if this is an enumeration value.
    pub fn as_enumeration(&self) -> Option<&str> {
        match self {
            FeatureValue::Enumeration(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// The integer, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FeatureValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FeatureValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Enumeration(symbol) => write!(f, "{}", symbol),
            FeatureValue::Integer(value) => write!(f, "{}", value),
            FeatureValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(symbol: &str) -> Self {
        FeatureValue::Enumeration(symbol.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(symbol: String) -> Self {
        FeatureValue::Enumeration(symbol)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Integer(value)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Boolean(value)
    }
}

/// The transport a device is reachable over.
///
/// The serial block behaves identically on every transport with one
/// exception: the GigE register interface accepts transfer-buffer writes in
/// whole 32-bit words only, so payloads must be zero-padded to a 4-byte
/// boundary before they are staged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transport {
    /// GigE Vision. Transfer-buffer writes must be 4-byte aligned.
    GigE,
    /// USB3 Vision.
    Usb3,
    /// Any other transport without special register access rules.
    Other,
}

impl Transport {
    /// Whether the 4-byte alignment rule for transfer-buffer writes applies.
    pub fn is_gige(&self) -> bool {
        matches!(self, Transport::GigE)
    }
}
