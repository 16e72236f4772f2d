//! Firmware emulation of the serial register block.

use std::collections::{HashMap, VecDeque};

use camuart_device::{CameraDevice, DeviceError, FeatureValue, Transport, nodes};

const LINES: [&str; 4] = ["Line1", "Line2", "Line3", "Line4"];
const RX_SOURCES: [&str; 3] = ["Off", "Line1", "Line2"];
const INPUT_CAPABLE: [&str; 2] = ["Line1", "Line2"];
const OUTPUT_CAPABLE: [&str; 2] = ["Line3", "Line4"];
const LINE_SOURCES: [&str; 2] = ["Off", nodes::LINE_SOURCE_SERIAL_TX];
const BAUD_RATES: [&str; 5] = [
    "Baud9600",
    "Baud19200",
    "Baud38400",
    "Baud57600",
    "Baud115200",
];
const DATA_BITS: [&str; 2] = ["Bits7", "Bits8"];
const PARITIES: [&str; 3] = ["Odd", "Even", "None"];
const STOP_BITS: [&str; 2] = ["Bits1", "Bits2"];

const DEFAULT_MAX_TRANSFER: usize = 64;
const DEFAULT_FIFO_DEPTH: usize = 512;

#[derive(Clone, Debug)]
struct LineState {
    mode: String,
    source: String,
    inverter: bool,
}

impl Default for LineState {
    fn default() -> Self {
        LineState {
            mode: nodes::LINE_MODE_INPUT.to_string(),
            source: "Off".to_string(),
            inverter: false,
        }
    }
}

/// Emulated camera with its serial TX looped back onto RX.
///
/// Transmitted bytes land in a depth-limited RX FIFO; once the FIFO is
/// full, further bytes are dropped and the RX overflow latch is set, like
/// on the real hardware. Echoing can be disabled with
/// [`LoopbackDevice::set_echo`] to play the far end of the link by hand via
/// [`LoopbackDevice::inject_rx`].
pub struct LoopbackDevice {
    open: bool,
    transport: Transport,
    max_transfer: usize,
    fifo_depth: usize,
    transfer_length: usize,
    buffer: Vec<u8>,
    rx_fifo: VecDeque<u8>,
    echo: bool,
    tx_log: Vec<u8>,
    rx_source: String,
    selected_line: String,
    lines: HashMap<String, LineState>,
    baud_rate: String,
    data_bits: String,
    parity: String,
    stop_bits: String,
    tx_break: bool,
    rx_break: bool,
    tx_fifo_overflow: bool,
    rx_fifo_overflow: bool,
    rx_parity_error: bool,
    rx_stop_bit_error: bool,
}

impl LoopbackDevice {
    /// An open device with default limits (64-byte transfer buffer, 512-byte
    /// RX FIFO) and echo enabled.
    pub fn new(transport: Transport) -> LoopbackDevice {
        LoopbackDevice::with_limits(transport, DEFAULT_MAX_TRANSFER, DEFAULT_FIFO_DEPTH)
    }

    pub fn with_limits(
        transport: Transport,
        max_transfer: usize,
        fifo_depth: usize,
    ) -> LoopbackDevice {
        LoopbackDevice {
            open: true,
            transport,
            max_transfer,
            fifo_depth,
            transfer_length: 0,
            buffer: vec![0; max_transfer],
            rx_fifo: VecDeque::new(),
            echo: true,
            tx_log: Vec::new(),
            rx_source: "Line2".to_string(),
            selected_line: "Line1".to_string(),
            lines: LINES
                .iter()
                .map(|line| (line.to_string(), LineState::default()))
                .collect(),
            baud_rate: "Baud115200".to_string(),
            data_bits: "Bits8".to_string(),
            parity: "None".to_string(),
            stop_bits: "Bits1".to_string(),
            tx_break: false,
            rx_break: false,
            tx_fifo_overflow: false,
            rx_fifo_overflow: false,
            rx_parity_error: false,
            rx_stop_bit_error: false,
        }
    }

    /// Enable or disable the TX-to-RX echo.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Feed bytes into the RX FIFO as if a remote peer sent them.
    pub fn inject_rx(&mut self, data: &[u8]) {
        for byte in data {
            if self.rx_fifo.len() >= self.fifo_depth {
                self.rx_fifo_overflow = true;
                log::debug!("RX FIFO overflow, dropping input");
                break;
            }
            self.rx_fifo.push_back(*byte);
        }
    }

    /// Simulate a received frame with a bad parity bit.
    pub fn inject_parity_error(&mut self) {
        self.rx_parity_error = true;
    }

    /// Simulate a received frame with a malformed stop bit.
    pub fn inject_stop_bit_error(&mut self) {
        self.rx_stop_bit_error = true;
    }

    /// Everything transmitted so far, in order.
    pub fn transmitted(&self) -> &[u8] {
        &self.tx_log
    }

    pub fn clear_transmitted(&mut self) {
        self.tx_log.clear();
    }

    fn require_open(&self) -> Result<(), DeviceError> {
        if self.open { Ok(()) } else { Err(DeviceError::NotOpen) }
    }

    fn selected_state(&mut self) -> &mut LineState {
        self.lines
            .get_mut(&self.selected_line)
            .expect("selector only accepts known lines")
    }

    fn expect_enumeration(
        node: &str,
        value: &FeatureValue,
        entries: &[&str],
    ) -> Result<String, DeviceError> {
        let symbol = value
            .as_enumeration()
            .ok_or_else(|| DeviceError::TypeMismatch {
                node: node.to_string(),
                expected: "Enumeration",
            })?;
        if !entries.contains(&symbol) {
            return Err(DeviceError::InvalidArgument {
                node: node.to_string(),
                reason: format!("{} is not an entry of {}", symbol, node),
            });
        }
        Ok(symbol.to_string())
    }

    fn expect_boolean(node: &str, value: &FeatureValue) -> Result<bool, DeviceError> {
        value.as_boolean().ok_or_else(|| DeviceError::TypeMismatch {
            node: node.to_string(),
            expected: "Boolean",
        })
    }

    fn transmit(&mut self) {
        if self.transfer_length == 0 {
            // a zero-length transmit recomputes the status latches
            self.tx_fifo_overflow = false;
            self.rx_fifo_overflow = false;
            self.rx_parity_error = false;
            self.rx_stop_bit_error = false;
            return;
        }
        let data: Vec<u8> = self.buffer[..self.transfer_length].to_vec();
        self.tx_log.extend_from_slice(&data);
        if self.echo {
            self.inject_rx(&data);
        }
        log::trace!("loopback transmit of {} bytes", data.len());
    }

    fn receive(&mut self) {
        let count = self.rx_fifo.len().min(self.max_transfer);
        for slot in self.buffer.iter_mut().take(count) {
            *slot = self.rx_fifo.pop_front().expect("count is bounded by len");
        }
        self.transfer_length = count;
        log::trace!("loopback receive of {count} bytes");
    }
}

impl CameraDevice for LoopbackDevice {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.open = false;
        Ok(())
    }

    fn transport(&self) -> Transport {
        self.transport
    }

    fn value(&self, node: &str) -> Result<FeatureValue, DeviceError> {
        self.require_open()?;
        let line = self
            .lines
            .get(&self.selected_line)
            .expect("selector only accepts known lines");
        let value = match node {
            nodes::SERIAL_TRANSFER_LENGTH => FeatureValue::Integer(self.transfer_length as i64),
            nodes::SERIAL_TX_FIFO_EMPTY => FeatureValue::Boolean(true),
            nodes::SERIAL_TX_FIFO_OVERFLOW => FeatureValue::Boolean(self.tx_fifo_overflow),
            nodes::SERIAL_RX_FIFO_OVERFLOW => FeatureValue::Boolean(self.rx_fifo_overflow),
            nodes::SERIAL_RX_PARITY_ERROR => FeatureValue::Boolean(self.rx_parity_error),
            nodes::SERIAL_RX_STOP_BIT_ERROR => FeatureValue::Boolean(self.rx_stop_bit_error),
            nodes::SERIAL_RX_BREAK => FeatureValue::Boolean(self.rx_break),
            nodes::SERIAL_TX_BREAK => FeatureValue::Boolean(self.tx_break),
            nodes::SERIAL_RX_SOURCE => FeatureValue::Enumeration(self.rx_source.clone()),
            nodes::LINE_SELECTOR => FeatureValue::Enumeration(self.selected_line.clone()),
            nodes::LINE_MODE => FeatureValue::Enumeration(line.mode.clone()),
            nodes::LINE_SOURCE => FeatureValue::Enumeration(line.source.clone()),
            nodes::LINE_INVERTER => FeatureValue::Boolean(line.inverter),
            nodes::SERIAL_BAUD_RATE => FeatureValue::Enumeration(self.baud_rate.clone()),
            nodes::SERIAL_NUMBER_OF_DATA_BITS => FeatureValue::Enumeration(self.data_bits.clone()),
            nodes::SERIAL_PARITY => FeatureValue::Enumeration(self.parity.clone()),
            nodes::SERIAL_NUMBER_OF_STOP_BITS => FeatureValue::Enumeration(self.stop_bits.clone()),
            _ => return Err(DeviceError::UnknownNode(node.to_string())),
        };
        Ok(value)
    }

    fn set_value(&mut self, node: &str, value: FeatureValue) -> Result<(), DeviceError> {
        self.require_open()?;
        match node {
            nodes::SERIAL_TRANSFER_LENGTH => {
                let length = value.as_integer().ok_or_else(|| DeviceError::TypeMismatch {
                    node: node.to_string(),
                    expected: "Integer",
                })?;
                if length < 0 || length as usize > self.max_transfer {
                    return Err(DeviceError::InvalidArgument {
                        node: node.to_string(),
                        reason: format!(
                            "{} exceeds the transfer maximum of {}",
                            length, self.max_transfer
                        ),
                    });
                }
                self.transfer_length = length as usize;
            }
            nodes::SERIAL_RX_SOURCE => {
                self.rx_source = Self::expect_enumeration(node, &value, &RX_SOURCES)?;
            }
            nodes::LINE_SELECTOR => {
                self.selected_line = Self::expect_enumeration(node, &value, &LINES)?;
            }
            nodes::LINE_MODE => {
                let mode = Self::expect_enumeration(
                    node,
                    &value,
                    &[nodes::LINE_MODE_INPUT, nodes::LINE_MODE_OUTPUT],
                )?;
                let line = self.selected_line.clone();
                let capable = match mode.as_str() {
                    nodes::LINE_MODE_INPUT => INPUT_CAPABLE.contains(&line.as_str()),
                    _ => OUTPUT_CAPABLE.contains(&line.as_str()),
                };
                if !capable {
                    return Err(DeviceError::InvalidArgument {
                        node: node.to_string(),
                        reason: format!("{} does not support mode {}", line, mode),
                    });
                }
                self.selected_state().mode = mode;
            }
            nodes::LINE_SOURCE => {
                let source = Self::expect_enumeration(node, &value, &LINE_SOURCES)?;
                let line = self.selected_line.clone();
                if source == nodes::LINE_SOURCE_SERIAL_TX
                    && !OUTPUT_CAPABLE.contains(&line.as_str())
                {
                    return Err(DeviceError::InvalidArgument {
                        node: node.to_string(),
                        reason: format!("{} cannot drive {}", line, nodes::LINE_SOURCE_SERIAL_TX),
                    });
                }
                self.selected_state().source = source;
            }
            nodes::LINE_INVERTER => {
                let inverter = Self::expect_boolean(node, &value)?;
                self.selected_state().inverter = inverter;
            }
            nodes::SERIAL_BAUD_RATE => {
                self.baud_rate = Self::expect_enumeration(node, &value, &BAUD_RATES)?;
            }
            nodes::SERIAL_NUMBER_OF_DATA_BITS => {
                self.data_bits = Self::expect_enumeration(node, &value, &DATA_BITS)?;
            }
            nodes::SERIAL_PARITY => {
                self.parity = Self::expect_enumeration(node, &value, &PARITIES)?;
            }
            nodes::SERIAL_NUMBER_OF_STOP_BITS => {
                self.stop_bits = Self::expect_enumeration(node, &value, &STOP_BITS)?;
            }
            nodes::SERIAL_TX_BREAK => {
                self.tx_break = Self::expect_boolean(node, &value)?;
                if self.tx_break {
                    // the break condition travels the loop like any frame
                    self.rx_break = true;
                }
            }
            _ => return Err(DeviceError::UnknownNode(node.to_string())),
        }
        Ok(())
    }

    fn symbolics(&self, node: &str) -> Result<Vec<String>, DeviceError> {
        let entries: &[&str] = match node {
            nodes::SERIAL_RX_SOURCE => &RX_SOURCES,
            nodes::LINE_SELECTOR => &LINES,
            nodes::LINE_MODE => &[nodes::LINE_MODE_INPUT, nodes::LINE_MODE_OUTPUT],
            nodes::LINE_SOURCE => &LINE_SOURCES,
            nodes::SERIAL_BAUD_RATE => &BAUD_RATES,
            nodes::SERIAL_NUMBER_OF_DATA_BITS => &DATA_BITS,
            nodes::SERIAL_PARITY => &PARITIES,
            nodes::SERIAL_NUMBER_OF_STOP_BITS => &STOP_BITS,
            _ => return Err(DeviceError::UnknownNode(node.to_string())),
        };
        Ok(entries.iter().map(|entry| entry.to_string()).collect())
    }

    fn max(&self, node: &str) -> Result<i64, DeviceError> {
        match node {
            nodes::SERIAL_TRANSFER_LENGTH => Ok(self.max_transfer as i64),
            _ => Err(DeviceError::UnknownNode(node.to_string())),
        }
    }

    fn execute(&mut self, action: &str) -> Result<(), DeviceError> {
        self.require_open()?;
        match action {
            nodes::SERIAL_TRANSMIT => {
                self.transmit();
                Ok(())
            }
            nodes::SERIAL_RECEIVE => {
                self.receive();
                Ok(())
            }
            nodes::SERIAL_RX_BREAK_RESET => {
                self.rx_break = false;
                Ok(())
            }
            _ => Err(DeviceError::UnknownNode(action.to_string())),
        }
    }

    fn buffer(&self) -> Result<Vec<u8>, DeviceError> {
        self.require_open()?;
        Ok(self.buffer.clone())
    }

    fn set_buffer(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        self.require_open()?;
        if data.len() > self.max_transfer {
            return Err(DeviceError::Hardware(format!(
                "transfer buffer overrun: {} > {}",
                data.len(),
                self.max_transfer
            )));
        }
        if self.transport.is_gige() && data.len() % 4 != 0 {
            return Err(DeviceError::Hardware(
                "GigE register access requires whole 32-bit words".to_string(),
            ));
        }
        self.buffer[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn buffer_capacity(&self) -> Result<usize, DeviceError> {
        Ok(self.max_transfer)
    }
}
