//! # Instrument
//!
//! [`Instrument`] is the main entry point of the crate: one slave on a serial
//! line, addressed in RTU or ASCII mode. Each call validates its arguments,
//! builds the request frame, runs one transaction and decodes the response.
//!
//! ```rust
//! use modbus_rs::{Instrument, MockSerialPort, TransmissionMode};
//!
//! let port = MockSerialPort::new();
//! port.add_response(
//!     &[0x01, 0x03, 0x01, 0x21, 0x00, 0x01, 0xD5, 0xFC],
//!     &[0x01, 0x03, 0x02, 0x03, 0x02, 0x39, 0x75],
//! );
//!
//! let mut instrument = Instrument::new(port, 1, TransmissionMode::Rtu);
//! assert_eq!(instrument.read_register(289, 1, 3, false).unwrap(), 77.0);
//! ```

use crate::constants::{
    MODBUS_BROADCAST_ADDRESS, MODBUS_FC_READ_COILS, MODBUS_FC_READ_DISCRETE_INPUTS,
    MODBUS_FC_READ_HOLDING_REGISTERS, MODBUS_FC_READ_INPUT_REGISTERS,
    MODBUS_FC_WRITE_MULTIPLE_COILS, MODBUS_FC_WRITE_MULTIPLE_REGISTERS,
    MODBUS_FC_WRITE_SINGLE_COIL, MODBUS_FC_WRITE_SINGLE_REGISTER,
};
use crate::error::ModbusError;
use crate::modbus::frame::{embed_payload, extract_payload, TransmissionMode};
use crate::modbus::serial::SerialTransport;
use crate::modbus::size::predict_response_size;
use crate::modbus::transaction::{SessionConfig, TransactionEngine};
use crate::payload::codec::ByteOrder;
use crate::payload::command::{Command, PayloadFormat, Value, WriteValue};
use log::debug;
use std::fmt;
use std::time::Duration;

const READ_BIT_FUNCTIONS: &[u8] = &[MODBUS_FC_READ_COILS, MODBUS_FC_READ_DISCRETE_INPUTS];
const WRITE_BIT_FUNCTIONS: &[u8] = &[MODBUS_FC_WRITE_SINGLE_COIL, MODBUS_FC_WRITE_MULTIPLE_COILS];
const READ_REGISTER_FUNCTIONS: &[u8] = &[
    MODBUS_FC_READ_HOLDING_REGISTERS,
    MODBUS_FC_READ_INPUT_REGISTERS,
];
const WRITE_REGISTER_FUNCTIONS: &[u8] = &[
    MODBUS_FC_WRITE_SINGLE_REGISTER,
    MODBUS_FC_WRITE_MULTIPLE_REGISTERS,
];

fn check_function_code(function_code: u8, allowed: &[u8], operation: &str) -> Result<(), ModbusError> {
    if allowed.contains(&function_code) {
        Ok(())
    } else {
        Err(ModbusError::InvalidArgument(format!(
            "function code {function_code} is not valid for {operation}, use one of {allowed:?}"
        )))
    }
}

/// A slave device on a Modbus serial line.
pub struct Instrument<T: SerialTransport> {
    slave_address: u8,
    mode: TransmissionMode,
    engine: TransactionEngine<T>,
}

impl<T: SerialTransport> Instrument<T> {
    /// Creates an instrument with the default session settings.
    pub fn new(transport: T, slave_address: u8, mode: TransmissionMode) -> Self {
        Self::with_session(transport, slave_address, mode, SessionConfig::default())
    }

    pub fn with_session(
        transport: T,
        slave_address: u8,
        mode: TransmissionMode,
        session: SessionConfig,
    ) -> Self {
        Instrument {
            slave_address,
            mode,
            engine: TransactionEngine::new(transport, session),
        }
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    pub fn mode(&self) -> TransmissionMode {
        self.mode
    }

    pub fn session(&self) -> &SessionConfig {
        self.engine.session()
    }

    pub fn session_mut(&mut self) -> &mut SessionConfig {
        self.engine.session_mut()
    }

    pub fn last_roundtrip_time(&self) -> Option<Duration> {
        self.engine.last_roundtrip_time()
    }

    pub fn transport(&self) -> &T {
        self.engine.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.engine.transport_mut()
    }

    pub fn is_broadcast(&self) -> bool {
        self.slave_address == MODBUS_BROADCAST_ADDRESS
    }

    /// Reads one coil (fc 1) or discrete input (fc 2).
    pub fn read_bit(&mut self, address: u16, function_code: u8) -> Result<u8, ModbusError> {
        check_function_code(function_code, READ_BIT_FUNCTIONS, "reading a bit")?;
        let value = self.execute(Command::new(function_code, address, PayloadFormat::Bit))?;
        value
            .as_i64()
            .map(|bit| bit as u8)
            .ok_or_else(|| unexpected_value("bit", &value))
    }

    /// Writes one coil with fc 5 or fc 15.
    pub fn write_bit(&mut self, address: u16, value: u8, function_code: u8) -> Result<(), ModbusError> {
        check_function_code(function_code, WRITE_BIT_FUNCTIONS, "writing a bit")?;
        let command = Command::new(function_code, address, PayloadFormat::Bit)
            .with_value(WriteValue::Bit(value));
        self.execute(command).map(|_| ())
    }

    pub fn read_bits(
        &mut self,
        address: u16,
        number_of_bits: u16,
        function_code: u8,
    ) -> Result<Vec<u8>, ModbusError> {
        check_function_code(function_code, READ_BIT_FUNCTIONS, "reading bits")?;
        let command =
            Command::new(function_code, address, PayloadFormat::Bits).with_bits(number_of_bits);
        let value = self.execute(command)?;
        value
            .clone()
            .into_bits()
            .ok_or_else(|| unexpected_value("bit list", &value))
    }

    /// Writes consecutive coils with fc 15.
    pub fn write_bits(&mut self, address: u16, bits: &[u8]) -> Result<(), ModbusError> {
        let number_of_bits = u16::try_from(bits.len()).map_err(|_| {
            ModbusError::InvalidArgument(format!("too many bits: {}", bits.len()))
        })?;
        let command = Command::new(MODBUS_FC_WRITE_MULTIPLE_COILS, address, PayloadFormat::Bits)
            .with_bits(number_of_bits)
            .with_value(WriteValue::Bits(bits.to_vec()));
        self.execute(command).map(|_| ())
    }

    /// Reads one register, divided by `10^number_of_decimals`.
    pub fn read_register(
        &mut self,
        address: u16,
        number_of_decimals: u8,
        function_code: u8,
        signed: bool,
    ) -> Result<f64, ModbusError> {
        check_function_code(function_code, READ_REGISTER_FUNCTIONS, "reading a register")?;
        let command = Command::new(function_code, address, PayloadFormat::Register)
            .with_decimals(number_of_decimals)
            .with_signed(signed);
        let value = self.execute(command)?;
        value
            .as_f64()
            .ok_or_else(|| unexpected_value("number", &value))
    }

    /// Writes one register with fc 6 or fc 16, scaled by `10^number_of_decimals`.
    pub fn write_register(
        &mut self,
        address: u16,
        value: f64,
        number_of_decimals: u8,
        function_code: u8,
        signed: bool,
    ) -> Result<(), ModbusError> {
        check_function_code(function_code, WRITE_REGISTER_FUNCTIONS, "writing a register")?;
        let command = Command::new(function_code, address, PayloadFormat::Register)
            .with_value(WriteValue::Number(value))
            .with_decimals(number_of_decimals)
            .with_signed(signed);
        self.execute(command).map(|_| ())
    }

    pub fn read_registers(
        &mut self,
        address: u16,
        number_of_registers: u16,
        function_code: u8,
    ) -> Result<Vec<u16>, ModbusError> {
        check_function_code(function_code, READ_REGISTER_FUNCTIONS, "reading registers")?;
        let command = Command::new(function_code, address, PayloadFormat::Registers)
            .with_registers(number_of_registers);
        let value = self.execute(command)?;
        value
            .clone()
            .into_registers()
            .ok_or_else(|| unexpected_value("register list", &value))
    }

    /// Writes consecutive registers with fc 16.
    pub fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), ModbusError> {
        let number_of_registers = u16::try_from(values.len()).map_err(|_| {
            ModbusError::InvalidArgument(format!("too many registers: {}", values.len()))
        })?;
        let command =
            Command::new(MODBUS_FC_WRITE_MULTIPLE_REGISTERS, address, PayloadFormat::Registers)
                .with_registers(number_of_registers)
                .with_value(WriteValue::Registers(values.to_vec()));
        self.execute(command).map(|_| ())
    }

    /// Reads a 32-bit (2 registers) or 64-bit (4 registers) integer.
    ///
    /// Unsigned 64-bit values beyond `i64::MAX` come back in full.
    pub fn read_long(
        &mut self,
        address: u16,
        function_code: u8,
        signed: bool,
        byte_order: ByteOrder,
        number_of_registers: u16,
    ) -> Result<i128, ModbusError> {
        check_function_code(function_code, READ_REGISTER_FUNCTIONS, "reading a long")?;
        let command = Command::new(function_code, address, PayloadFormat::Long)
            .with_registers(number_of_registers)
            .with_signed(signed)
            .with_byte_order(byte_order);
        let value = self.execute(command)?;
        value
            .as_i128()
            .ok_or_else(|| unexpected_value("integer", &value))
    }

    pub fn write_long(
        &mut self,
        address: u16,
        value: i128,
        signed: bool,
        byte_order: ByteOrder,
        number_of_registers: u16,
    ) -> Result<(), ModbusError> {
        let command = Command::new(MODBUS_FC_WRITE_MULTIPLE_REGISTERS, address, PayloadFormat::Long)
            .with_value(WriteValue::Integer(value))
            .with_registers(number_of_registers)
            .with_signed(signed)
            .with_byte_order(byte_order);
        self.execute(command).map(|_| ())
    }

    /// Reads an IEEE-754 single (2 registers) or double (4 registers).
    pub fn read_float(
        &mut self,
        address: u16,
        function_code: u8,
        number_of_registers: u16,
        byte_order: ByteOrder,
    ) -> Result<f64, ModbusError> {
        check_function_code(function_code, READ_REGISTER_FUNCTIONS, "reading a float")?;
        let command = Command::new(function_code, address, PayloadFormat::Float)
            .with_registers(number_of_registers)
            .with_byte_order(byte_order);
        let value = self.execute(command)?;
        value
            .as_f64()
            .ok_or_else(|| unexpected_value("number", &value))
    }

    pub fn write_float(
        &mut self,
        address: u16,
        value: f64,
        number_of_registers: u16,
        byte_order: ByteOrder,
    ) -> Result<(), ModbusError> {
        let command = Command::new(MODBUS_FC_WRITE_MULTIPLE_REGISTERS, address, PayloadFormat::Float)
            .with_value(WriteValue::Number(value))
            .with_registers(number_of_registers)
            .with_byte_order(byte_order);
        self.execute(command).map(|_| ())
    }

    /// Reads text stored two characters per register.
    pub fn read_string(
        &mut self,
        address: u16,
        number_of_registers: u16,
        function_code: u8,
    ) -> Result<String, ModbusError> {
        check_function_code(function_code, READ_REGISTER_FUNCTIONS, "reading a string")?;
        let command = Command::new(function_code, address, PayloadFormat::String)
            .with_registers(number_of_registers);
        let value = self.execute(command)?;
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| unexpected_value("text", &value))
    }

    /// Writes text, space padded to fill `number_of_registers` registers.
    pub fn write_string(
        &mut self,
        address: u16,
        text: &str,
        number_of_registers: u16,
    ) -> Result<(), ModbusError> {
        let command =
            Command::new(MODBUS_FC_WRITE_MULTIPLE_REGISTERS, address, PayloadFormat::String)
                .with_value(WriteValue::Text(text.to_string()))
                .with_registers(number_of_registers);
        self.execute(command).map(|_| ())
    }

    /// Runs an arbitrary command and returns the decoded response.
    ///
    /// Writes to the broadcast address return `Value::None` once the request is sent.
    pub fn execute(&mut self, command: Command) -> Result<Value, ModbusError> {
        if self.is_broadcast() && !command.is_write() {
            return Err(ModbusError::InvalidArgument(format!(
                "function code {} reads data and cannot be broadcast to address {MODBUS_BROADCAST_ADDRESS}",
                command.function_code
            )));
        }

        let request_payload = command.build_request()?;
        debug!(
            "Slave {}: fc {} {} at address {}",
            self.slave_address, command.function_code, command.format, command.address
        );
        let response_payload = self.perform(command.function_code, &request_payload, true)?;
        if self.is_broadcast() {
            return Ok(Value::None);
        }
        command.parse_response(&response_payload)
    }

    /// Sends `payload` with any function code and returns the raw response payload.
    ///
    /// The response length is not predicted, so the read lasts until the transport
    /// timeout.
    pub fn raw_command(&mut self, function_code: u8, payload: &[u8]) -> Result<Vec<u8>, ModbusError> {
        self.perform(function_code, payload, false)
    }

    fn perform(
        &mut self,
        function_code: u8,
        payload: &[u8],
        predict_size: bool,
    ) -> Result<Vec<u8>, ModbusError> {
        let request = embed_payload(self.slave_address, self.mode, function_code, payload)?;
        let broadcast = self.is_broadcast();
        let expected_len = if predict_size && !broadcast {
            Some(predict_response_size(self.mode, function_code, payload)?)
        } else {
            None
        };

        let response = self.engine.communicate(&request, expected_len, broadcast)?;
        if broadcast {
            return Ok(Vec::new());
        }
        extract_payload(&response, self.slave_address, self.mode, function_code)
    }
}

fn unexpected_value(expected: &str, value: &Value) -> ModbusError {
    ModbusError::InvalidResponse(format!("expected a {expected}, decoded {value}"))
}

impl<T: SerialTransport> fmt::Display for Instrument<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session();
        write!(
            f,
            "Instrument(slave {}, {} mode, {}, close_port_after_each_call={}, \
             clear_buffers_before_each_transaction={}, handle_local_echo={}, \
             precalculate_read_size={}, debug={})",
            self.slave_address,
            self.mode,
            self.transport().describe(),
            session.close_port_after_each_call,
            session.clear_buffers_before_each_transaction,
            session.handle_local_echo,
            session.precalculate_read_size,
            session.debug
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::serial_mock::MockSerialPort;

    #[test]
    fn test_accessors() {
        let mut instrument = Instrument::new(MockSerialPort::new(), 7, TransmissionMode::Ascii);
        assert_eq!(instrument.slave_address(), 7);
        assert_eq!(instrument.mode(), TransmissionMode::Ascii);
        assert!(instrument.last_roundtrip_time().is_none());
        instrument.session_mut().debug = true;
        assert!(instrument.session().debug);
        assert!(instrument.to_string().contains("slave 7"));
        assert!(instrument.to_string().contains("debug=true"));
    }

    #[test]
    fn test_function_code_checks_before_io() {
        let port = MockSerialPort::new();
        let mut instrument = Instrument::new(port.clone(), 1, TransmissionMode::Rtu);
        assert!(instrument.read_register(0, 0, 6, false).is_err());
        assert!(instrument.read_bit(0, 3).is_err());
        assert!(instrument.write_bit(0, 1, 1).is_err());
        assert!(instrument.write_register(0, 1.0, 0, 3, false).is_err());
        assert!(port.written_frames().is_empty());
    }

    #[test]
    fn test_broadcast_read_rejected() {
        let port = MockSerialPort::new();
        let mut instrument = Instrument::new(port.clone(), 0, TransmissionMode::Rtu);
        assert!(matches!(
            instrument.read_register(0, 0, 3, false),
            Err(ModbusError::InvalidArgument(_))
        ));
        assert!(port.written_frames().is_empty());
    }

    #[test]
    fn test_raw_command() {
        let port = MockSerialPort::new();
        // fc 8 diagnostic loopback
        port.add_response(
            &[0x01, 0x08, 0x00, 0x00, 0xA5, 0x37, 0xDA, 0x8D],
            &[0x01, 0x08, 0x00, 0x00, 0xA5, 0x37, 0xDA, 0x8D],
        );
        let mut instrument = Instrument::new(port, 1, TransmissionMode::Rtu);
        assert_eq!(
            instrument.raw_command(8, &[0x00, 0x00, 0xA5, 0x37]).unwrap(),
            vec![0x00, 0x00, 0xA5, 0x37]
        );
    }
}
