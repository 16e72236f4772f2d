//! Canonical node and action names of the camera serial register block.
//!
//! Grouped the way the firmware groups them: line routing, frame format,
//! transfer registers, execute actions, status bits.

// Line routing
pub const SERIAL_RX_SOURCE: &str = "SerialRxSource";
pub const LINE_SELECTOR: &str = "LineSelector";
pub const LINE_MODE: &str = "LineMode";
pub const LINE_SOURCE: &str = "LineSource";
pub const LINE_INVERTER: &str = "LineInverter";

/// `LineSource` entry that routes the serial transmitter onto the selected
/// line.
pub const LINE_SOURCE_SERIAL_TX: &str = "SerialTx";
/// `LineMode` entry for input lines.
pub const LINE_MODE_INPUT: &str = "Input";
/// `LineMode` entry for output lines.
pub const LINE_MODE_OUTPUT: &str = "Output";

// Frame format
pub const SERIAL_BAUD_RATE: &str = "SerialBaudRate";
pub const SERIAL_NUMBER_OF_DATA_BITS: &str = "SerialNumberOfDataBits";
pub const SERIAL_PARITY: &str = "SerialParity";
pub const SERIAL_NUMBER_OF_STOP_BITS: &str = "SerialNumberOfStopBits";

// Transfer registers
/// Bounded integer register: length of the next transmit, or the number of
/// bytes delivered by the last receive. Its maximum is the largest single
/// transfer the hardware accepts.
pub const SERIAL_TRANSFER_LENGTH: &str = "SerialTransferLength";
/// The bounded byte buffer shared by both directions.
pub const SERIAL_TRANSFER_BUFFER: &str = "SerialTransferBuffer";

// Execute actions
pub const SERIAL_TRANSMIT: &str = "SerialTransmit";
pub const SERIAL_RECEIVE: &str = "SerialReceive";
pub const SERIAL_RX_BREAK_RESET: &str = "SerialRxBreakReset";

// Status and break bits
pub const SERIAL_TX_FIFO_EMPTY: &str = "SerialTxFifoEmpty";
pub const SERIAL_TX_FIFO_OVERFLOW: &str = "SerialTxFifoOverflow";
pub const SERIAL_RX_FIFO_OVERFLOW: &str = "SerialRxFifoOverflow";
pub const SERIAL_RX_PARITY_ERROR: &str = "SerialRxParityError";
pub const SERIAL_RX_STOP_BIT_ERROR: &str = "SerialRxStopBitError";
pub const SERIAL_RX_BREAK: &str = "SerialRxBreak";
pub const SERIAL_TX_BREAK: &str = "SerialTxBreak";
