//! The serial bridge: stream semantics over the camera's register-based
//! software UART.

use std::fmt::Display;
use std::time::Duration;

use camuart_device::{CameraDevice, DeviceError, FeatureValue, nodes};

use crate::SerialPort;
use crate::buffer::InputBuffer;
use crate::config::{FrameConfig, LineMapping};
use crate::error::SerialError;
use crate::wait::{Clock, Deadline, SystemClock};

/// Settle time after draining, so the last frame leaves the wire.
/// (Start + 8 data + parity + 2 stop) / 1200 baud = 10 ms; 50 ms covers
/// every supported rate.
const RESET_SETTLE: Duration = Duration::from_millis(50);

/// One of the five hardware error/condition bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusFlag {
    TxFifoOverflow,
    RxFifoOverflow,
    RxParityError,
    RxStopBitError,
    BreakOnRx,
}

impl StatusFlag {
    /// All flags, in the fixed order they are reported in.
    pub const ALL: [StatusFlag; 5] = [
        StatusFlag::TxFifoOverflow,
        StatusFlag::RxFifoOverflow,
        StatusFlag::RxParityError,
        StatusFlag::RxStopBitError,
        StatusFlag::BreakOnRx,
    ];

    /// The tag used in status reports and error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            StatusFlag::TxFifoOverflow => "TX_FIFO_OVERFLOW",
            StatusFlag::RxFifoOverflow => "RX_FIFO_OVERFLOW",
            StatusFlag::RxParityError => "RX_PARITY_ERROR",
            StatusFlag::RxStopBitError => "RX_STOP_BIT_ERROR",
            StatusFlag::BreakOnRx => "BREAK_ON_RX",
        }
    }

    fn node(&self) -> &'static str {
        match self {
            StatusFlag::TxFifoOverflow => nodes::SERIAL_TX_FIFO_OVERFLOW,
            StatusFlag::RxFifoOverflow => nodes::SERIAL_RX_FIFO_OVERFLOW,
            StatusFlag::RxParityError => nodes::SERIAL_RX_PARITY_ERROR,
            StatusFlag::RxStopBitError => nodes::SERIAL_RX_STOP_BIT_ERROR,
            StatusFlag::BreakOnRx => nodes::SERIAL_RX_BREAK,
        }
    }
}

impl Display for StatusFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Bridge configuration: line mapping, frame format, timing.
#[derive(Clone, Debug)]
pub struct Config {
    pub line: LineMapping,
    pub frame: FrameConfig,
    /// Deadline for every wait-for-condition operation.
    pub timeout: Duration,
    /// Minimum interval between condition re-checks, to bound busy waiting.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line: LineMapping::default(),
            frame: FrameConfig::default(),
            timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Builder to create a [`SerialBridge`] and modify configuration options.
///
/// # Example
///
/// ```ignore
/// use camuart_bridge::bridge::Builder;
/// use std::time::Duration;
///
/// let bridge = Builder::new()
///     .rx_source("Line2")
///     .tx_sink("Line3")
///     .timeout(Duration::from_millis(500))
///     .build(device)?;
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the input line the RX signal is sampled from.
    pub fn rx_source(mut self, line: impl Into<String>) -> Self {
        self.config.line.rx_source = line.into();
        self
    }

    /// Set the output line the TX signal is driven onto.
    pub fn tx_sink(mut self, line: impl Into<String>) -> Self {
        self.config.line.tx_sink = line.into();
        self
    }

    /// Set the serial frame format.
    pub fn frame(mut self, frame: FrameConfig) -> Self {
        self.config.frame = frame;
        self
    }

    /// Set the deadline for wait-for-condition operations.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the minimum interval between condition re-checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Build the bridge: open the device if necessary, apply line and frame
    /// configuration, and reset both buffers.
    pub fn build<D: CameraDevice>(self, device: D) -> Result<SerialBridge<D>, SerialError> {
        SerialBridge::with_clock(device, self.config, SystemClock)
    }

    /// Like [`Builder::build`], with an explicit clock. Tests use this with
    /// a [`ManualClock`](crate::wait::ManualClock) to simulate elapsed time.
    pub fn build_with_clock<D: CameraDevice, C: Clock>(
        self,
        device: D,
        clock: C,
    ) -> Result<SerialBridge<D, C>, SerialError> {
        SerialBridge::with_clock(device, self.config, clock)
    }
}

/// Serial-port adapter over one camera device.
///
/// The bridge owns the device handle for its lifetime but not the device's
/// open/close lifecycle: by default the device stays open when the bridge is
/// closed, since it usually outlives the bridge. See [`SerialBridge::close`].
pub struct SerialBridge<D: CameraDevice, C: Clock = SystemClock> {
    device: D,
    clock: C,
    config: Config,
    input_buffer: InputBuffer,
    is_open: bool,
}

impl<D: CameraDevice> SerialBridge<D> {
    /// Create a bridge with the given configuration and the system clock.
    pub fn new(device: D, config: Config) -> Result<SerialBridge<D>, SerialError> {
        SerialBridge::with_clock(device, config, SystemClock)
    }
}

impl<D: CameraDevice, C: Clock> SerialBridge<D, C> {
    pub fn with_clock(device: D, config: Config, clock: C) -> Result<SerialBridge<D, C>, SerialError> {
        let mut bridge = SerialBridge {
            device,
            clock,
            config,
            input_buffer: InputBuffer::new(),
            is_open: false,
        };
        bridge.open()?;
        bridge.reset_input_buffer()?;
        bridge.reset_output_buffer()?;
        Ok(bridge)
    }

    /// Ensure the device is open and the port is configured.
    ///
    /// The device is usually already open; this re-applies the stored line
    /// mapping and frame format if the port was closed in between.
    pub fn open(&mut self) -> Result<(), SerialError> {
        if !self.device.is_open() {
            self.device.open()?;
            log::debug!("camera device opened");
        }
        if !self.is_open {
            self.reconfigure()?;
            self.is_open = true;
        }
        Ok(())
    }

    /// Close the port. The device is left open unless `close_device` is set:
    /// it normally remains open throughout its own lifecycle and may be
    /// shared with acquisition code.
    pub fn close(&mut self, close_device: bool) -> Result<(), SerialError> {
        self.is_open = false;
        if close_device && self.device.is_open() {
            self.device.close()?;
        }
        Ok(())
    }

    /// Whether the port is configured and usable.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the bridge, returning the device handle.
    pub fn into_device(self) -> D {
        self.device
    }

    /// The currently configured line mapping.
    pub fn line(&self) -> &LineMapping {
        &self.config.line
    }

    /// The currently configured frame format.
    pub fn frame(&self) -> FrameConfig {
        self.config.frame
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    fn reconfigure(&mut self) -> Result<(), SerialError> {
        log::debug!("reconfiguring serial port");
        let LineMapping { rx_source, tx_sink } = self.config.line.clone();
        self.configure_line(&rx_source, &tx_sink, false)?;
        let frame = self.config.frame;
        self.configure_frame(frame)
    }

    /// Map the UART onto physical I/O lines.
    ///
    /// `rx_source` must be one of the device's enumerated RX sources. With
    /// `touch_rx_line`, the RX line (if selectable) is forced into input
    /// mode, non-inverted. The TX sink is always selected and configured as
    /// serial output; a device rejection means the line cannot drive the
    /// transmitter and surfaces as [`SerialError::LineNotTxCapable`].
    ///
    /// Idempotent; safe to call repeatedly. The stored mapping is only
    /// updated on success.
    pub fn configure_line(
        &mut self,
        rx_source: &str,
        tx_sink: &str,
        touch_rx_line: bool,
    ) -> Result<(), SerialError> {
        let available = self.device.symbolics(nodes::SERIAL_RX_SOURCE)?;
        if !available.iter().any(|entry| entry == rx_source) {
            return Err(SerialError::UnsupportedLine {
                line: rx_source.to_string(),
                available,
            });
        }
        self.set_enum(nodes::SERIAL_RX_SOURCE, rx_source)?;

        if touch_rx_line {
            let lines = self.device.symbolics(nodes::LINE_SELECTOR)?;
            if lines.iter().any(|entry| entry == rx_source) {
                self.set_enum(nodes::LINE_SELECTOR, rx_source)?;
                self.set_enum(nodes::LINE_MODE, nodes::LINE_MODE_INPUT)?;
                self.set_bool(nodes::LINE_INVERTER, false)?;
            }
        }

        if let Err(err) = self.route_tx(tx_sink) {
            return Err(match err {
                SerialError::Device(DeviceError::InvalidArgument { reason, .. }) => {
                    SerialError::LineNotTxCapable {
                        line: tx_sink.to_string(),
                        reason,
                    }
                }
                other => other,
            });
        }

        self.config.line = LineMapping::new(rx_source, tx_sink);
        log::debug!("configured RX source {rx_source}, TX sink {tx_sink}");
        Ok(())
    }

    fn route_tx(&mut self, tx_sink: &str) -> Result<(), SerialError> {
        self.set_enum(nodes::LINE_SELECTOR, tx_sink)?;
        self.set_enum(nodes::LINE_MODE, nodes::LINE_MODE_OUTPUT)?;
        self.set_enum(nodes::LINE_SOURCE, nodes::LINE_SOURCE_SERIAL_TX)?;
        self.set_bool(nodes::LINE_INVERTER, false)
    }

    /// Set the timing of the serial frame.
    ///
    /// Each value is written as a symbolic enumeration entry; a combination
    /// the device does not support surfaces as
    /// [`SerialError::FrameConfigurationRejected`] carrying the device's own
    /// rejection text. The stored format is only updated on success.
    pub fn configure_frame(&mut self, frame: FrameConfig) -> Result<(), SerialError> {
        match self.write_frame_registers(&frame) {
            Ok(()) => {}
            Err(SerialError::Device(DeviceError::InvalidArgument { reason, .. })) => {
                return Err(SerialError::FrameConfigurationRejected { frame, reason });
            }
            Err(other) => return Err(other),
        }
        self.config.frame = frame;
        log::debug!("configured serial frame {frame}");
        Ok(())
    }

    fn write_frame_registers(&mut self, frame: &FrameConfig) -> Result<(), SerialError> {
        self.set_enum(nodes::SERIAL_BAUD_RATE, &frame.baud_symbolic())?;
        self.set_enum(nodes::SERIAL_NUMBER_OF_DATA_BITS, &frame.data_bits_symbolic())?;
        self.set_enum(nodes::SERIAL_PARITY, frame.parity.symbolic())?;
        self.set_enum(nodes::SERIAL_NUMBER_OF_STOP_BITS, &frame.stop_bits_symbolic())
    }

    /// Send a single chunk, no larger than the hardware's maximum transfer
    /// length.
    ///
    /// Stages the payload in the transfer buffer, writes the length register
    /// and triggers the transmit action. With `block`, waits until the TX
    /// FIFO reports empty; otherwise returns with the transmission in
    /// flight.
    ///
    /// # Returns
    ///
    /// The number of payload bytes handed to the hardware.
    pub fn single_send(&mut self, data: &[u8], block: bool) -> Result<usize, SerialError> {
        if data.is_empty() {
            return Ok(0);
        }
        let max = self.max_transfer_len()?;
        if data.len() > max {
            return Err(SerialError::PayloadTooLarge {
                max,
                got: data.len(),
            });
        }

        self.set_int(nodes::SERIAL_TRANSFER_LENGTH, data.len() as i64)?;

        let mut payload = data.to_vec();
        if self.device.transport().is_gige() {
            // the GigE register interface accepts whole 32-bit words only
            let tail = payload.len() % 4;
            if tail != 0 {
                payload.resize(payload.len() + (4 - tail), 0);
            }
        }
        if let Err(err) = self.device.set_buffer(&payload) {
            return Err(SerialError::TransferBufferWriteError(err.to_string()));
        }

        self.device.execute(nodes::SERIAL_TRANSMIT)?;
        log::trace!("transmit {} bytes: {:02x?}", data.len(), data);

        if block {
            self.flush()?;
        }
        Ok(data.len())
    }

    /// Write `data`, slicing it at the hardware's maximum transfer length.
    ///
    /// The hardware cannot queue more than one transfer, so a write that
    /// needs more than one slice always blocks until each slice has drained,
    /// regardless of `block`; the override is logged as a warning.
    ///
    /// # Returns
    ///
    /// The total number of bytes accepted, equal to `data.len()` unless a
    /// send fails.
    pub fn write(&mut self, data: &[u8], block: bool) -> Result<usize, SerialError> {
        if data.is_empty() {
            return Ok(0);
        }
        let max = self.max_transfer_len()?;
        let mut block = block;
        if data.len() > max && !block {
            log::warn!("forced blocking during write, due to camera tx-buffer limit of {max} bytes");
            block = true;
        }

        let mut sent = 0;
        for chunk in data.chunks(max) {
            sent += self.single_send(chunk, block)?;
        }
        Ok(sent)
    }

    /// Pull whatever the device has received into the host-side input
    /// buffer. Never blocks.
    pub fn receive(&mut self) -> Result<(), SerialError> {
        self.device.execute(nodes::SERIAL_RECEIVE)?;
        let pending = self.read_int(nodes::SERIAL_TRANSFER_LENGTH)? as usize;
        if pending == 0 {
            return Ok(());
        }
        let data = self.device.buffer()?;
        let pending = pending.min(data.len());
        self.input_buffer.push(&data[..pending]);
        log::trace!("received {} bytes: {:02x?}", pending, &data[..pending]);
        Ok(())
    }

    /// Read exactly `size` bytes from the input buffer, polling the device
    /// for more data while the deadline allows.
    ///
    /// On timeout, returns however many bytes are available, possibly none.
    /// A short read is a valid outcome, not an error.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>, SerialError> {
        let mut deadline = Deadline::start(&self.clock, self.config.timeout, self.config.poll_interval);
        while deadline.poll(&self.clock) {
            if self.input_buffer.len() >= size {
                return Ok(self.input_buffer.take(size));
            }
            self.receive()?;
        }
        Ok(self.input_buffer.take(size))
    }

    /// Read until `expected` is found, a size cap is reached, or the
    /// deadline passes, whichever comes first.
    ///
    /// On a match, the delimiter is consumed from the buffer but not
    /// included in the returned payload. On timeout, returns whatever is
    /// available, with the same short-result policy as
    /// [`SerialBridge::read`].
    pub fn read_until(
        &mut self,
        expected: &[u8],
        size: Option<usize>,
    ) -> Result<Vec<u8>, SerialError> {
        let mut deadline = Deadline::start(&self.clock, self.config.timeout, self.config.poll_interval);
        while deadline.poll(&self.clock) {
            if let Some(at) = self.input_buffer.find(expected) {
                let payload = self.input_buffer.take(at);
                self.input_buffer.discard(expected.len());
                return Ok(payload);
            }
            if let Some(cap) = size {
                if self.input_buffer.len() >= cap {
                    return Ok(self.input_buffer.take(cap));
                }
            }
            self.receive()?;
        }
        Ok(match size {
            Some(cap) => self.input_buffer.take(cap),
            None => self.input_buffer.take_all(),
        })
    }

    /// Block until the TX FIFO reports empty.
    ///
    /// # Error Handling
    ///
    /// Unlike the read path, an expired deadline here is a hard
    /// [`SerialError::FlushTimeout`]: a caller that flushes explicitly wants
    /// the guarantee that everything left the wire.
    pub fn flush(&mut self) -> Result<(), SerialError> {
        let mut deadline = Deadline::start(&self.clock, self.config.timeout, self.config.poll_interval);
        while deadline.poll(&self.clock) {
            if self.read_bool(nodes::SERIAL_TX_FIFO_EMPTY)? {
                return Ok(());
            }
        }
        Err(SerialError::FlushTimeout {
            waited: self.config.timeout,
        })
    }

    /// Full protocol-level reset of host and device state.
    ///
    /// Clears the host input buffer and the break condition, drains the
    /// device until nothing is pending in either direction (hard timeout,
    /// like [`SerialBridge::flush`]), waits for the last frame to leave the
    /// wire, clears the break-reset latch, zeroes the transfer buffer and
    /// length register, and re-triggers a transmit to refresh the overflow
    /// status. Fails with [`SerialError::ResetIncomplete`] if TX FIFO
    /// overflow is still asserted afterwards.
    pub fn reset(&mut self) -> Result<(), SerialError> {
        log::debug!("serial reset started");
        self.input_buffer.clear();

        self.set_bool(nodes::SERIAL_TX_BREAK, false)?;
        self.device.execute(nodes::SERIAL_RECEIVE)?;

        let mut deadline = Deadline::start(&self.clock, self.config.timeout, self.config.poll_interval);
        loop {
            if !deadline.poll(&self.clock) {
                return Err(SerialError::FlushTimeout {
                    waited: self.config.timeout,
                });
            }
            if self.read_int(nodes::SERIAL_TRANSFER_LENGTH)? == 0
                && self.read_bool(nodes::SERIAL_TX_FIFO_EMPTY)?
            {
                break;
            }
            self.device.execute(nodes::SERIAL_RECEIVE)?;
        }

        // let the last frame leave the wire
        self.clock.sleep(RESET_SETTLE);

        self.device.execute(nodes::SERIAL_RX_BREAK_RESET)?;

        let capacity = self.device.buffer_capacity()?;
        self.device.set_buffer(&vec![0; capacity])?;
        self.set_int(nodes::SERIAL_TRANSFER_LENGTH, 0)?;

        // transmit refreshes the TX FIFO overflow status
        self.device.execute(nodes::SERIAL_TRANSMIT)?;
        if self.read_bool(nodes::SERIAL_TX_FIFO_OVERFLOW)? {
            return Err(SerialError::ResetIncomplete);
        }
        log::debug!("serial reset done");
        Ok(())
    }

    /// Read the five status flags and return the set ones, in the fixed
    /// order of [`StatusFlag::ALL`]. Checking does not clear the underlying
    /// device bits; [`SerialBridge::reset`] does.
    ///
    /// With `assert_ok`, any set flag raises
    /// [`SerialError::SerialLineError`] carrying the flag list. This is the
    /// diagnostic entry point after a suspicious transfer.
    pub fn check_status(&self, assert_ok: bool) -> Result<Vec<StatusFlag>, SerialError> {
        let mut set = Vec::new();
        for flag in StatusFlag::ALL {
            if self.read_bool(flag.node())? {
                set.push(flag);
            }
        }
        log::debug!("serial status checked: {set:?}");
        if assert_ok && !set.is_empty() {
            return Err(SerialError::SerialLineError(set));
        }
        Ok(set)
    }

    /// Number of buffered input bytes, after one [`SerialBridge::receive`].
    /// Not a pure query: anything pending on the device is pulled in first.
    pub fn in_waiting(&mut self) -> Result<usize, SerialError> {
        self.receive()?;
        Ok(self.input_buffer.len())
    }

    /// 1 while the TX FIFO still holds data, else 0. The hardware exposes no
    /// exact count, so this is a boolean signal only.
    pub fn out_waiting(&self) -> Result<usize, SerialError> {
        Ok(if self.read_bool(nodes::SERIAL_TX_FIFO_EMPTY)? {
            0
        } else {
            1
        })
    }

    /// Discard buffered input on the host and drain pending bytes on the
    /// device until the transfer-length register reads zero.
    pub fn reset_input_buffer(&mut self) -> Result<(), SerialError> {
        self.input_buffer.clear();
        let mut deadline = Deadline::start(&self.clock, self.config.timeout, self.config.poll_interval);
        while self.read_int(nodes::SERIAL_TRANSFER_LENGTH)? != 0 {
            if !deadline.poll(&self.clock) {
                return Err(SerialError::FlushTimeout {
                    waited: self.config.timeout,
                });
            }
            self.device.execute(nodes::SERIAL_RECEIVE)?;
        }
        log::debug!("input buffer reset done");
        Ok(())
    }

    /// Drain the device-side output buffer. There is no host-side output
    /// buffer, so this is [`SerialBridge::flush`].
    pub fn reset_output_buffer(&mut self) -> Result<(), SerialError> {
        self.flush()
    }

    /// Drive or release the TX break condition.
    pub fn set_break(&mut self, on: bool) -> Result<(), SerialError> {
        self.set_bool(nodes::SERIAL_TX_BREAK, on)
    }

    fn max_transfer_len(&self) -> Result<usize, SerialError> {
        Ok(self.device.max(nodes::SERIAL_TRANSFER_LENGTH)? as usize)
    }

    fn read_bool(&self, node: &str) -> Result<bool, SerialError> {
        self.device.value(node)?.as_boolean().ok_or_else(|| {
            SerialError::Device(DeviceError::TypeMismatch {
                node: node.to_string(),
                expected: "Boolean",
            })
        })
    }

    fn read_int(&self, node: &str) -> Result<i64, SerialError> {
        self.device.value(node)?.as_integer().ok_or_else(|| {
            SerialError::Device(DeviceError::TypeMismatch {
                node: node.to_string(),
                expected: "Integer",
            })
        })
    }

    fn set_enum(&mut self, node: &str, symbol: &str) -> Result<(), SerialError> {
        self.device
            .set_value(node, FeatureValue::Enumeration(symbol.to_string()))?;
        Ok(())
    }

    fn set_int(&mut self, node: &str, value: i64) -> Result<(), SerialError> {
        self.device.set_value(node, FeatureValue::Integer(value))?;
        Ok(())
    }

    fn set_bool(&mut self, node: &str, value: bool) -> Result<(), SerialError> {
        self.device.set_value(node, FeatureValue::Boolean(value))?;
        Ok(())
    }
}

impl<D: CameraDevice, C: Clock> SerialPort for SerialBridge<D, C> {
    fn open(&mut self) -> Result<(), SerialError> {
        SerialBridge::open(self)
    }

    fn close(&mut self) -> Result<(), SerialError> {
        SerialBridge::close(self, false)
    }

    fn read(&mut self, size: usize) -> Result<Vec<u8>, SerialError> {
        SerialBridge::read(self, size)
    }

    fn read_until(
        &mut self,
        expected: &[u8],
        size: Option<usize>,
    ) -> Result<Vec<u8>, SerialError> {
        SerialBridge::read_until(self, expected, size)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        SerialBridge::write(self, data, true)
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        SerialBridge::flush(self)
    }

    fn reset_input_buffer(&mut self) -> Result<(), SerialError> {
        SerialBridge::reset_input_buffer(self)
    }

    fn reset_output_buffer(&mut self) -> Result<(), SerialError> {
        SerialBridge::reset_output_buffer(self)
    }

    fn in_waiting(&mut self) -> Result<usize, SerialError> {
        SerialBridge::in_waiting(self)
    }

    fn out_waiting(&mut self) -> Result<usize, SerialError> {
        SerialBridge::out_waiting(self)
    }

    fn set_break(&mut self, on: bool) -> Result<(), SerialError> {
        SerialBridge::set_break(self, on)
    }
}

#[cfg(test)]
mod test {
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    use camuart_device::Transport;

    use super::*;
    use crate::config::Parity;
    use crate::wait::ManualClock;

    const BUFFER_CAPACITY: usize = 64;

    /// Scripted stand-in for the device capability surface. Every receive
    /// action pops the next scripted chunk; node writes and buffer writes
    /// are recorded for assertions.
    struct FakeDevice {
        open: bool,
        transport: Transport,
        max_transfer: i64,
        transfer_length: i64,
        buffer: Vec<u8>,
        rx_script: VecDeque<Vec<u8>>,
        tx_fifo_empty: bool,
        flags: HashMap<&'static str, bool>,
        values: HashMap<String, FeatureValue>,
        rejects: HashMap<&'static str, String>,
        node_writes: usize,
        buffer_writes: Vec<Vec<u8>>,
        reject_buffer_writes: bool,
        transmits: usize,
    }

    impl FakeDevice {
        fn new() -> FakeDevice {
            FakeDevice {
                open: true,
                transport: Transport::Usb3,
                max_transfer: BUFFER_CAPACITY as i64,
                transfer_length: 0,
                buffer: vec![0; BUFFER_CAPACITY],
                rx_script: VecDeque::new(),
                tx_fifo_empty: true,
                flags: HashMap::new(),
                values: HashMap::new(),
                rejects: HashMap::new(),
                node_writes: 0,
                buffer_writes: Vec::new(),
                reject_buffer_writes: false,
                transmits: 0,
            }
        }

        fn gige() -> FakeDevice {
            let mut device = FakeDevice::new();
            device.transport = Transport::GigE;
            device
        }

        fn script_rx(&mut self, data: &[u8]) {
            self.rx_script.push_back(data.to_vec());
        }

        fn set_flag(&mut self, node: &'static str, on: bool) {
            self.flags.insert(node, on);
        }
    }

    impl CameraDevice for FakeDevice {
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
            match node {
                nodes::SERIAL_TRANSFER_LENGTH => Ok(FeatureValue::Integer(self.transfer_length)),
                nodes::SERIAL_TX_FIFO_EMPTY => Ok(FeatureValue::Boolean(self.tx_fifo_empty)),
                nodes::SERIAL_TX_FIFO_OVERFLOW
                | nodes::SERIAL_RX_FIFO_OVERFLOW
                | nodes::SERIAL_RX_PARITY_ERROR
                | nodes::SERIAL_RX_STOP_BIT_ERROR
                | nodes::SERIAL_RX_BREAK => Ok(FeatureValue::Boolean(
                    *self.flags.get(node).unwrap_or(&false),
                )),
                _ => self
                    .values
                    .get(node)
                    .cloned()
                    .ok_or_else(|| DeviceError::UnknownNode(node.to_string())),
            }
        }

        fn set_value(&mut self, node: &str, value: FeatureValue) -> Result<(), DeviceError> {
            if let Some(reason) = self.rejects.get(node) {
                return Err(DeviceError::InvalidArgument {
                    node: node.to_string(),
                    reason: reason.clone(),
                });
            }
            self.node_writes += 1;
            match node {
                nodes::SERIAL_TRANSFER_LENGTH => {
                    self.transfer_length = value.as_integer().unwrap();
                }
                _ => {
                    self.values.insert(node.to_string(), value);
                }
            }
            Ok(())
        }

        fn symbolics(&self, node: &str) -> Result<Vec<String>, DeviceError> {
            let entries: &[&str] = match node {
                nodes::SERIAL_RX_SOURCE => &["Off", "Line1", "Line2"],
                nodes::LINE_SELECTOR => &["Line1", "Line2", "Line3"],
                _ => return Err(DeviceError::UnknownNode(node.to_string())),
            };
            Ok(entries.iter().map(|entry| entry.to_string()).collect())
        }

        fn max(&self, node: &str) -> Result<i64, DeviceError> {
            match node {
                nodes::SERIAL_TRANSFER_LENGTH => Ok(self.max_transfer),
                _ => Err(DeviceError::UnknownNode(node.to_string())),
            }
        }

        fn execute(&mut self, action: &str) -> Result<(), DeviceError> {
            match action {
                nodes::SERIAL_TRANSMIT => {
                    self.transmits += 1;
                    Ok(())
                }
                nodes::SERIAL_RECEIVE => {
                    match self.rx_script.pop_front() {
                        Some(data) => {
                            self.transfer_length = data.len() as i64;
                            self.buffer[..data.len()].copy_from_slice(&data);
                        }
                        None => self.transfer_length = 0,
                    }
                    Ok(())
                }
                nodes::SERIAL_RX_BREAK_RESET => {
                    self.flags.insert(nodes::SERIAL_RX_BREAK, false);
                    Ok(())
                }
                _ => Err(DeviceError::UnknownNode(action.to_string())),
            }
        }

        fn buffer(&self) -> Result<Vec<u8>, DeviceError> {
            Ok(self.buffer.clone())
        }

        fn set_buffer(&mut self, data: &[u8]) -> Result<(), DeviceError> {
            if self.reject_buffer_writes {
                return Err(DeviceError::Hardware("register write failed".to_string()));
            }
            assert!(data.len() <= BUFFER_CAPACITY);
            self.buffer[..data.len()].copy_from_slice(data);
            self.buffer_writes.push(data.to_vec());
            Ok(())
        }

        fn buffer_capacity(&self) -> Result<usize, DeviceError> {
            Ok(BUFFER_CAPACITY)
        }
    }

    fn bridge(device: FakeDevice) -> SerialBridge<FakeDevice, ManualClock> {
        Builder::new()
            .timeout(Duration::from_millis(500))
            .poll_interval(Duration::from_millis(100))
            .build_with_clock(device, ManualClock::new())
            .unwrap()
    }

    #[test]
    fn single_send_reports_length_and_sets_register() {
        let mut bridge = bridge(FakeDevice::new());
        let sent = bridge.single_send(b"ping", true).unwrap();
        assert_eq!(sent, 4);
        assert_eq!(bridge.device().transfer_length, 4);
        assert_eq!(bridge.device().transmits, 1);
        assert_eq!(bridge.device().buffer_writes.last().unwrap(), b"ping");
    }

    #[test]
    fn zero_length_send_is_a_noop() {
        let mut bridge = bridge(FakeDevice::new());
        let writes_before = bridge.device().node_writes;
        assert_eq!(bridge.single_send(b"", true).unwrap(), 0);
        assert_eq!(bridge.device().transmits, 0);
        assert_eq!(bridge.device().node_writes, writes_before);
    }

    #[test]
    fn oversized_send_fails_without_device_write() {
        let mut bridge = bridge(FakeDevice::new());
        let writes_before = bridge.device().node_writes;
        let payload = vec![0xAA; BUFFER_CAPACITY + 1];
        match bridge.single_send(&payload, true) {
            Err(SerialError::PayloadTooLarge { max, got }) => {
                assert_eq!(max, BUFFER_CAPACITY);
                assert_eq!(got, BUFFER_CAPACITY + 1);
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other.map(|_| ())),
        }
        assert_eq!(bridge.device().node_writes, writes_before);
        assert!(bridge.device().buffer_writes.is_empty());
        assert_eq!(bridge.device().transmits, 0);
    }

    #[test]
    fn gige_payload_is_padded_to_word_boundary() {
        let mut bridge = bridge(FakeDevice::gige());
        bridge.single_send(b"abc", true).unwrap();
        assert_eq!(bridge.device().buffer_writes.last().unwrap(), b"abc\x00");
        // the length register carries the real payload length
        assert_eq!(bridge.device().transfer_length, 3);
    }

    #[test]
    fn non_gige_payload_is_not_padded() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.single_send(b"abc", true).unwrap();
        assert_eq!(bridge.device().buffer_writes.last().unwrap(), b"abc");
    }

    #[test]
    fn buffer_write_rejection_is_reported() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().reject_buffer_writes = true;
        match bridge.single_send(b"x", true) {
            Err(SerialError::TransferBufferWriteError(reason)) => {
                assert!(reason.contains("register write failed"));
            }
            other => panic!("expected TransferBufferWriteError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn multi_chunk_write_forces_blocking_and_sends_everything() {
        let mut bridge = bridge(FakeDevice::new());
        let payload = vec![0x55; BUFFER_CAPACITY * 2 + 22];
        let sent = bridge.write(&payload, false).unwrap();
        assert_eq!(sent, payload.len());
        assert_eq!(bridge.device().transmits, 3);
        assert_eq!(bridge.device().buffer_writes.last().unwrap().len(), 22);
    }

    #[test]
    fn flush_times_out_when_fifo_never_drains() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().tx_fifo_empty = false;
        match bridge.flush() {
            Err(SerialError::FlushTimeout { waited }) => {
                assert_eq!(waited, Duration::from_millis(500));
            }
            other => panic!("expected FlushTimeout, got {:?}", other),
        }
    }

    #[test]
    fn read_returns_short_on_timeout() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"ab");
        assert_eq!(bridge.read(5).unwrap(), b"ab");
    }

    #[test]
    fn read_returns_empty_when_nothing_arrives() {
        let mut bridge = bridge(FakeDevice::new());
        assert!(bridge.read(1).unwrap().is_empty());
    }

    #[test]
    fn read_leaves_the_remainder_in_the_buffer() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"hello!");
        assert_eq!(bridge.read(5).unwrap(), b"hello");
        assert_eq!(bridge.in_waiting().unwrap(), 1);
    }

    #[test]
    fn read_until_excludes_the_delimiter() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"OK\r\n");
        assert_eq!(bridge.read_until(b"\r\n", None).unwrap(), b"OK");
        assert_eq!(bridge.in_waiting().unwrap(), 0);
    }

    #[test]
    fn read_until_assembles_chunked_input() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"O");
        bridge.device_mut().script_rx(b"K\r");
        bridge.device_mut().script_rx(b"\n");
        assert_eq!(bridge.read_until(b"\n", None).unwrap(), b"OK\r");
    }

    #[test]
    fn read_until_respects_the_size_cap() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"abcdef");
        assert_eq!(bridge.read_until(b"\n", Some(4)).unwrap(), b"abcd");
        assert_eq!(bridge.in_waiting().unwrap(), 2);
    }

    #[test]
    fn read_until_returns_available_on_timeout() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"par");
        assert_eq!(bridge.read_until(b"\n", None).unwrap(), b"par");
    }

    #[test]
    fn check_status_reports_flags_in_fixed_order() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().set_flag(nodes::SERIAL_RX_BREAK, true);
        bridge.device_mut().set_flag(nodes::SERIAL_TX_FIFO_OVERFLOW, true);
        bridge.device_mut().set_flag(nodes::SERIAL_RX_PARITY_ERROR, true);

        let flags = bridge.check_status(false).unwrap();
        assert_eq!(
            flags,
            vec![
                StatusFlag::TxFifoOverflow,
                StatusFlag::RxParityError,
                StatusFlag::BreakOnRx,
            ]
        );

        match bridge.check_status(true) {
            Err(SerialError::SerialLineError(reported)) => assert_eq!(reported, flags),
            other => panic!("expected SerialLineError, got {:?}", other),
        }
    }

    #[test]
    fn check_status_is_quiet_when_clean() {
        let bridge = bridge(FakeDevice::new());
        assert!(bridge.check_status(true).unwrap().is_empty());
    }

    #[test]
    fn unsupported_rx_source_leaves_mapping_untouched() {
        let mut bridge = bridge(FakeDevice::new());
        let writes_before = bridge.device().node_writes;
        match bridge.configure_line("Line9", "Line3", true) {
            Err(SerialError::UnsupportedLine { line, available }) => {
                assert_eq!(line, "Line9");
                assert!(available.contains(&"Line2".to_string()));
            }
            other => panic!("expected UnsupportedLine, got {:?}", other),
        }
        assert_eq!(bridge.line(), &LineMapping::new("Line2", "Line3"));
        assert_eq!(bridge.device().node_writes, writes_before);
    }

    #[test]
    fn tx_rejection_names_the_line() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().rejects.insert(
            nodes::LINE_SOURCE,
            "line cannot drive SerialTx".to_string(),
        );
        match bridge.configure_line("Line2", "Line1", true) {
            Err(SerialError::LineNotTxCapable { line, reason }) => {
                assert_eq!(line, "Line1");
                assert!(reason.contains("cannot drive"));
            }
            other => panic!("expected LineNotTxCapable, got {:?}", other),
        }
        assert_eq!(bridge.line(), &LineMapping::new("Line2", "Line3"));
    }

    #[test]
    fn rejected_frame_carries_the_device_text() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().rejects.insert(
            nodes::SERIAL_BAUD_RATE,
            "Baud300 is not an entry of SerialBaudRate".to_string(),
        );
        let frame = FrameConfig::new(300, 8, Parity::None, 1);
        match bridge.configure_frame(frame) {
            Err(SerialError::FrameConfigurationRejected { frame: rejected, reason }) => {
                assert_eq!(rejected, frame);
                assert!(reason.contains("Baud300"));
            }
            other => panic!("expected FrameConfigurationRejected, got {:?}", other),
        }
        assert_eq!(bridge.frame(), FrameConfig::default());
    }

    #[test]
    fn reset_round_trip_clears_everything() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().script_rx(b"junk");
        bridge.receive().unwrap();
        assert_eq!(bridge.in_waiting().unwrap(), 4);

        bridge.reset().unwrap();

        assert_eq!(bridge.in_waiting().unwrap(), 0);
        assert_eq!(bridge.device().transfer_length, 0);
        let zeroed = bridge.device().buffer_writes.last().unwrap();
        assert_eq!(zeroed.len(), BUFFER_CAPACITY);
        assert!(zeroed.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn reset_fails_while_overflow_is_asserted() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.device_mut().set_flag(nodes::SERIAL_TX_FIFO_OVERFLOW, true);
        match bridge.reset() {
            Err(SerialError::ResetIncomplete) => {}
            other => panic!("expected ResetIncomplete, got {:?}", other),
        }
    }

    #[test]
    fn out_waiting_is_a_boolean_signal() {
        let mut bridge = bridge(FakeDevice::new());
        assert_eq!(bridge.out_waiting().unwrap(), 0);
        bridge.device_mut().tx_fifo_empty = false;
        assert_eq!(bridge.out_waiting().unwrap(), 1);
    }

    #[test]
    fn set_break_writes_the_break_node() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.set_break(true).unwrap();
        assert_eq!(
            bridge.device().values.get(nodes::SERIAL_TX_BREAK),
            Some(&FeatureValue::Boolean(true))
        );
    }

    #[test]
    fn close_leaves_the_device_open_by_default() {
        let mut bridge = bridge(FakeDevice::new());
        bridge.close(false).unwrap();
        assert!(!bridge.is_open());
        assert!(bridge.device().is_open());

        bridge.open().unwrap();
        assert!(bridge.is_open());

        bridge.close(true).unwrap();
        assert!(!bridge.device().is_open());
    }
}
