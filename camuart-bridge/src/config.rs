//! Frame format and line mapping configuration.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::SerialError;

/// Parity of the serial frame.
///
/// The camera supports odd, even, and no parity. Parsing accepts the full
/// names case-insensitively as well as the single-letter codes (`N`, `E`,
/// `O`) conventional serial libraries use.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Parity {
    Odd,
    Even,
    None,
}

impl Parity {
    /// The symbolic entry of the device's parity enumeration.
    pub fn symbolic(&self) -> &'static str {
        match self {
            Parity::Odd => "Odd",
            Parity::Even => "Even",
            Parity::None => "None",
        }
    }

    /// The single-letter code.
    pub fn code(&self) -> char {
        match self {
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::None => 'N',
        }
    }
}

impl Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbolic())
    }
}

impl FromStr for Parity {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            "none" | "n" => Ok(Parity::None),
            _ => Err(SerialError::UnsupportedParity(s.to_string())),
        }
    }
}

/// Frame format of the serial link: baud rate, data bits, parity, stop bits.
///
/// The values are written to the device as symbolic enumeration entries
/// (baud 115200 becomes `Baud115200`); a combination the device does not
/// support is rejected at configuration time, never silently clamped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl FrameConfig {
    pub fn new(baud_rate: u32, data_bits: u8, parity: Parity, stop_bits: u8) -> FrameConfig {
        FrameConfig {
            baud_rate,
            data_bits,
            parity,
            stop_bits,
        }
    }

    pub(crate) fn baud_symbolic(&self) -> String {
        format!("Baud{}", self.baud_rate)
    }

    pub(crate) fn data_bits_symbolic(&self) -> String {
        format!("Bits{}", self.data_bits)
    }

    pub(crate) fn stop_bits_symbolic(&self) -> String {
        format!("Bits{}", self.stop_bits)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            baud_rate: 115200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl Display for FrameConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate,
            self.data_bits,
            self.parity.code(),
            self.stop_bits
        )
    }
}

/// The physical I/O lines the UART is mapped onto.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineMapping {
    /// Source of the RX signal (an input line).
    pub rx_source: String,
    /// Sink of the TX signal (an output-capable line).
    pub tx_sink: String,
}

impl LineMapping {
    pub fn new(rx_source: impl Into<String>, tx_sink: impl Into<String>) -> LineMapping {
        LineMapping {
            rx_source: rx_source.into(),
            tx_sink: tx_sink.into(),
        }
    }
}

impl Default for LineMapping {
    fn default() -> Self {
        LineMapping::new("Line2", "Line3")
    }
}
