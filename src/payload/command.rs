//! # Request Payload Builder and Response Parser
//!
//! A [`Command`] describes one operation on a slave: function code, start
//! address, payload format, counts, scaling and (for writes) the value. It is
//! validated as a whole before anything is encoded, turned into a request
//! payload, and later used to check and decode the matching response payload.

use crate::constants::{
    MODBUS_COIL_OFF, MODBUS_COIL_ON, MODBUS_FC_READ_COILS, MODBUS_FC_READ_DISCRETE_INPUTS,
    MODBUS_FC_READ_HOLDING_REGISTERS, MODBUS_FC_READ_INPUT_REGISTERS,
    MODBUS_FC_WRITE_MULTIPLE_COILS, MODBUS_FC_WRITE_MULTIPLE_REGISTERS,
    MODBUS_FC_WRITE_SINGLE_COIL, MODBUS_FC_WRITE_SINGLE_REGISTER, MODBUS_MAX_DECIMALS,
    MODBUS_MAX_READ_BITS, MODBUS_MAX_READ_REGISTERS, MODBUS_MAX_WRITE_BITS,
    MODBUS_MAX_WRITE_REGISTERS,
};
use crate::error::ModbusError;
use crate::payload::codec::{
    bytes_for_bits, decode_bits, decode_float, decode_long, decode_register, decode_registers,
    decode_text, encode_bits, encode_float, encode_long, encode_register, encode_registers,
    encode_text, ByteOrder,
};
use crate::util::hex::format_hex_compact;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// How the data part of a payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Bit,
    Bits,
    /// One 16-bit register, optionally scaled and signed.
    Register,
    Registers,
    /// 32-bit or 64-bit integer over 2 or 4 registers.
    Long,
    /// IEEE-754 single or double over 2 or 4 registers.
    Float,
    String,
}

impl PayloadFormat {
    pub fn is_bit_format(&self) -> bool {
        matches!(self, PayloadFormat::Bit | PayloadFormat::Bits)
    }

    fn allowed_function_codes(&self) -> &'static [u8] {
        match self {
            PayloadFormat::Bit => &[
                MODBUS_FC_READ_COILS,
                MODBUS_FC_READ_DISCRETE_INPUTS,
                MODBUS_FC_WRITE_SINGLE_COIL,
                MODBUS_FC_WRITE_MULTIPLE_COILS,
            ],
            PayloadFormat::Bits => &[
                MODBUS_FC_READ_COILS,
                MODBUS_FC_READ_DISCRETE_INPUTS,
                MODBUS_FC_WRITE_MULTIPLE_COILS,
            ],
            PayloadFormat::Register => &[
                MODBUS_FC_READ_HOLDING_REGISTERS,
                MODBUS_FC_READ_INPUT_REGISTERS,
                MODBUS_FC_WRITE_SINGLE_REGISTER,
                MODBUS_FC_WRITE_MULTIPLE_REGISTERS,
            ],
            PayloadFormat::Registers
            | PayloadFormat::Long
            | PayloadFormat::Float
            | PayloadFormat::String => &[
                MODBUS_FC_READ_HOLDING_REGISTERS,
                MODBUS_FC_READ_INPUT_REGISTERS,
                MODBUS_FC_WRITE_MULTIPLE_REGISTERS,
            ],
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadFormat::Bit => "bit",
            PayloadFormat::Bits => "bits",
            PayloadFormat::Register => "register",
            PayloadFormat::Registers => "registers",
            PayloadFormat::Long => "long",
            PayloadFormat::Float => "float",
            PayloadFormat::String => "string",
        };
        f.write_str(name)
    }
}

/// Value to be written by a write command.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// 0 or 1
    Bit(u8),
    Bits(Vec<u8>),
    /// Register or float value
    Number(f64),
    /// Long value; `i128` covers both signed and unsigned 64-bit longs
    Integer(i128),
    Text(String),
    Registers(Vec<u16>),
}

impl WriteValue {
    fn kind(&self) -> &'static str {
        match self {
            WriteValue::Bit(_) => "bit",
            WriteValue::Bits(_) => "bit list",
            WriteValue::Number(_) => "number",
            WriteValue::Integer(_) => "integer",
            WriteValue::Text(_) => "text",
            WriteValue::Registers(_) => "register list",
        }
    }
}

/// Decoded response data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Write acknowledged
    None,
    Int(i128),
    Float(f64),
    Text(String),
    Bits(Vec<u8>),
    Registers(Vec<u16>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer value, if it fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_bits(self) -> Option<Vec<u8>> {
        match self {
            Value::Bits(bits) => Some(bits),
            _ => None,
        }
    }

    pub fn into_registers(self) -> Option<Vec<u16>> {
        match self {
            Value::Registers(registers) => Some(registers),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "(none)"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Bits(bits) => write!(f, "{bits:?}"),
            Value::Registers(registers) => write!(f, "{registers:?}"),
        }
    }
}

/// One read or write operation against a slave.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub function_code: u8,
    pub address: u16,
    pub value: Option<WriteValue>,
    pub number_of_decimals: u8,
    pub number_of_registers: u16,
    pub number_of_bits: u16,
    pub signed: bool,
    pub byte_order: ByteOrder,
    pub format: PayloadFormat,
}

fn invalid(msg: impl Into<String>) -> ModbusError {
    ModbusError::InvalidArgument(msg.into())
}

fn invalid_response(msg: impl Into<String>) -> ModbusError {
    ModbusError::InvalidResponse(msg.into())
}

/// Decoding failures on received data are response errors, not caller errors.
fn as_response_error(err: ModbusError) -> ModbusError {
    match err {
        ModbusError::InvalidArgument(msg) => ModbusError::InvalidResponse(msg),
        other => other,
    }
}

fn is_write_function(function_code: u8) -> bool {
    matches!(
        function_code,
        MODBUS_FC_WRITE_SINGLE_COIL
            | MODBUS_FC_WRITE_SINGLE_REGISTER
            | MODBUS_FC_WRITE_MULTIPLE_COILS
            | MODBUS_FC_WRITE_MULTIPLE_REGISTERS
    )
}

impl Command {
    /// Creates a command with the usual counts for `format`.
    ///
    /// `Bit` covers one bit, `Register` one register, `Long` and `Float` two
    /// registers. `Bits`, `Registers` and `String` need an explicit count.
    pub fn new(function_code: u8, address: u16, format: PayloadFormat) -> Self {
        let (number_of_bits, number_of_registers) = match format {
            PayloadFormat::Bit => (1, 0),
            PayloadFormat::Register => (0, 1),
            PayloadFormat::Long | PayloadFormat::Float => (0, 2),
            PayloadFormat::Bits | PayloadFormat::Registers | PayloadFormat::String => (0, 0),
        };
        Command {
            function_code,
            address,
            value: None,
            number_of_decimals: 0,
            number_of_registers,
            number_of_bits,
            signed: false,
            byte_order: ByteOrder::Big,
            format,
        }
    }

    pub fn with_value(mut self, value: WriteValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_decimals(mut self, number_of_decimals: u8) -> Self {
        self.number_of_decimals = number_of_decimals;
        self
    }

    pub fn with_registers(mut self, number_of_registers: u16) -> Self {
        self.number_of_registers = number_of_registers;
        self
    }

    pub fn with_bits(mut self, number_of_bits: u16) -> Self {
        self.number_of_bits = number_of_bits;
        self
    }

    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn is_write(&self) -> bool {
        is_write_function(self.function_code)
    }

    /// Checks the whole combination of fields.
    pub fn validate(&self) -> Result<(), ModbusError> {
        let fc = self.function_code;
        if !self.format.allowed_function_codes().contains(&fc) {
            return Err(invalid(format!(
                "function code {fc} cannot be used with the {} format",
                self.format
            )));
        }

        if self.number_of_decimals > MODBUS_MAX_DECIMALS {
            return Err(invalid(format!(
                "number of decimals must be 0..={MODBUS_MAX_DECIMALS}, got {}",
                self.number_of_decimals
            )));
        }
        if self.number_of_decimals > 0 && self.format != PayloadFormat::Register {
            return Err(invalid(format!(
                "decimals are only allowed for the register format, got {} for {}",
                self.number_of_decimals, self.format
            )));
        }

        self.validate_counts()?;
        self.validate_value()
    }

    fn validate_counts(&self) -> Result<(), ModbusError> {
        let write = self.is_write();
        let (max_bits, max_registers) = if write {
            (MODBUS_MAX_WRITE_BITS, MODBUS_MAX_WRITE_REGISTERS)
        } else {
            (MODBUS_MAX_READ_BITS, MODBUS_MAX_READ_REGISTERS)
        };

        if self.format.is_bit_format() && self.number_of_registers != 0 {
            return Err(invalid(format!(
                "number of registers must be 0 for the {} format, got {}",
                self.format, self.number_of_registers
            )));
        }
        if !self.format.is_bit_format() && self.number_of_bits != 0 {
            return Err(invalid(format!(
                "number of bits must be 0 for the {} format, got {}",
                self.format, self.number_of_bits
            )));
        }

        match self.format {
            PayloadFormat::Bit if self.number_of_bits != 1 => Err(invalid(format!(
                "number of bits must be 1 for the bit format, got {}",
                self.number_of_bits
            ))),
            PayloadFormat::Bits if !(1..=max_bits).contains(&self.number_of_bits) => {
                Err(invalid(format!(
                    "number of bits must be 1..={max_bits}, got {}",
                    self.number_of_bits
                )))
            }
            PayloadFormat::Register if self.number_of_registers != 1 => Err(invalid(format!(
                "number of registers must be 1 for the register format, got {}",
                self.number_of_registers
            ))),
            PayloadFormat::Registers | PayloadFormat::String
                if !(1..=max_registers).contains(&self.number_of_registers) =>
            {
                Err(invalid(format!(
                    "number of registers must be 1..={max_registers}, got {}",
                    self.number_of_registers
                )))
            }
            PayloadFormat::Long | PayloadFormat::Float
                if self.number_of_registers != 2 && self.number_of_registers != 4 =>
            {
                Err(invalid(format!(
                    "number of registers must be 2 or 4 for the {} format, got {}",
                    self.format, self.number_of_registers
                )))
            }
            _ => Ok(()),
        }
    }

    fn validate_value(&self) -> Result<(), ModbusError> {
        let value = match (&self.value, self.is_write()) {
            (None, false) => return Ok(()),
            (Some(value), false) => {
                return Err(invalid(format!(
                    "function code {} is a read and takes no value, got a {}",
                    self.function_code,
                    value.kind()
                )))
            }
            (None, true) => {
                return Err(invalid(format!(
                    "function code {} is a write and needs a value",
                    self.function_code
                )))
            }
            (Some(value), true) => value,
        };

        match (self.format, value) {
            (PayloadFormat::Bit, WriteValue::Bit(bit)) if *bit > 1 => {
                Err(invalid(format!("bit value must be 0 or 1, got {bit}")))
            }
            (PayloadFormat::Bits, WriteValue::Bits(bits)) => {
                if bits.len() != usize::from(self.number_of_bits) {
                    return Err(invalid(format!(
                        "number of bits is {} but {} bit value(s) were given",
                        self.number_of_bits,
                        bits.len()
                    )));
                }
                match bits.iter().find(|b| **b > 1) {
                    Some(bad) => Err(invalid(format!("bit values must be 0 or 1, got {bad}"))),
                    None => Ok(()),
                }
            }
            (PayloadFormat::Registers, WriteValue::Registers(registers))
                if registers.len() != usize::from(self.number_of_registers) =>
            {
                Err(invalid(format!(
                    "number of registers is {} but {} register value(s) were given",
                    self.number_of_registers,
                    registers.len()
                )))
            }
            (PayloadFormat::Bit, WriteValue::Bit(_))
            | (PayloadFormat::Register, WriteValue::Number(_))
            | (PayloadFormat::Registers, WriteValue::Registers(_))
            | (PayloadFormat::Long, WriteValue::Integer(_))
            | (PayloadFormat::Float, WriteValue::Number(_))
            | (PayloadFormat::String, WriteValue::Text(_)) => Ok(()),
            (format, value) => Err(ModbusError::TypeMismatch(format!(
                "the {format} format cannot be written from a {}",
                value.kind()
            ))),
        }
    }

    /// Encodes the data part of a write.
    fn encode_data(&self, value: &WriteValue) -> Result<Vec<u8>, ModbusError> {
        match (self.format, value) {
            (PayloadFormat::Bit, WriteValue::Bit(bit)) => encode_bits(&[*bit]),
            (PayloadFormat::Bits, WriteValue::Bits(bits)) => encode_bits(bits),
            (PayloadFormat::Register, WriteValue::Number(v)) => {
                Ok(encode_register(*v, self.number_of_decimals, self.signed)?.to_vec())
            }
            (PayloadFormat::Registers, WriteValue::Registers(registers)) => {
                Ok(encode_registers(registers))
            }
            (PayloadFormat::Long, WriteValue::Integer(v)) => {
                encode_long(*v, self.signed, self.number_of_registers, self.byte_order)
            }
            (PayloadFormat::Float, WriteValue::Number(v)) => {
                encode_float(*v, self.number_of_registers, self.byte_order)
            }
            (PayloadFormat::String, WriteValue::Text(text)) => {
                encode_text(text, self.number_of_registers)
            }
            (format, value) => Err(ModbusError::TypeMismatch(format!(
                "the {format} format cannot be written from a {}",
                value.kind()
            ))),
        }
    }

    fn count(&self) -> u16 {
        if self.format.is_bit_format() {
            self.number_of_bits
        } else {
            self.number_of_registers
        }
    }

    /// Builds the request payload (everything between function code and checksum).
    pub fn build_request(&self) -> Result<Vec<u8>, ModbusError> {
        self.validate()?;

        let mut payload = BytesMut::with_capacity(6 + 2 * usize::from(MODBUS_MAX_WRITE_REGISTERS));
        payload.put_u16(self.address);

        let value = match &self.value {
            None => {
                payload.put_u16(self.count());
                return Ok(payload.to_vec());
            }
            Some(value) => value,
        };

        let data = self.encode_data(value)?;
        match self.function_code {
            MODBUS_FC_WRITE_SINGLE_COIL => {
                let on = matches!(value, WriteValue::Bit(1));
                payload.put_u16(if on { MODBUS_COIL_ON } else { MODBUS_COIL_OFF });
            }
            MODBUS_FC_WRITE_SINGLE_REGISTER => payload.put_slice(&data),
            _ => {
                // Multiple coils / registers: count, byte count, data
                let byte_count = u8::try_from(data.len()).map_err(|_| {
                    invalid(format!("{} data bytes do not fit a byte count", data.len()))
                })?;
                payload.put_u16(self.count());
                payload.put_u8(byte_count);
                payload.put_slice(&data);
            }
        }
        Ok(payload.to_vec())
    }

    /// Number of data bytes a read response carries.
    fn expected_data_length(&self) -> usize {
        if self.format.is_bit_format() {
            bytes_for_bits(self.number_of_bits)
        } else {
            2 * usize::from(self.number_of_registers)
        }
    }

    /// Checks a response payload against this command and decodes it.
    pub fn parse_response(&self, payload: &[u8]) -> Result<Value, ModbusError> {
        if self.is_write() {
            self.check_write_acknowledgement(payload)?;
            return Ok(Value::None);
        }

        let (byte_count, data) = payload
            .split_first()
            .ok_or_else(|| invalid_response("read response payload is empty"))?;
        let byte_count = usize::from(*byte_count);
        if byte_count != data.len() {
            return Err(invalid_response(format!(
                "byte count field is {byte_count} but {} data byte(s) were received",
                data.len()
            )));
        }
        let expected = self.expected_data_length();
        if byte_count != expected {
            return Err(invalid_response(format!(
                "byte count field is {byte_count} but {expected} was expected for {} {}",
                self.count(),
                if self.format.is_bit_format() { "bit(s)" } else { "register(s)" }
            )));
        }

        let value = match self.format {
            PayloadFormat::Bit => decode_bits(data, 1).map(|bits| Value::Int(i128::from(bits[0]))),
            PayloadFormat::Bits => decode_bits(data, self.number_of_bits).map(Value::Bits),
            PayloadFormat::Register => {
                decode_register(data, self.number_of_decimals, self.signed).map(Value::Float)
            }
            PayloadFormat::Registers => decode_registers(data).map(Value::Registers),
            PayloadFormat::Long => decode_long(data, self.signed, self.byte_order).map(Value::Int),
            PayloadFormat::Float => decode_float(data, self.byte_order).map(Value::Float),
            PayloadFormat::String => decode_text(data).map(Value::Text),
        };
        value.map_err(as_response_error)
    }

    fn check_write_acknowledgement(&self, payload: &[u8]) -> Result<(), ModbusError> {
        if payload.len() != 4 {
            return Err(invalid_response(format!(
                "write acknowledgement must be 4 bytes, got {}: [{}]",
                payload.len(),
                format_hex_compact(payload)
            )));
        }

        let address = u16::from_be_bytes([payload[0], payload[1]]);
        if address != self.address {
            return Err(invalid_response(format!(
                "wrong address in write acknowledgement: expected {}, received {address}",
                self.address
            )));
        }

        match self.function_code {
            MODBUS_FC_WRITE_SINGLE_COIL | MODBUS_FC_WRITE_SINGLE_REGISTER => {
                let request = self.build_request()?;
                if payload[2..4] != request[2..4] {
                    return Err(invalid_response(format!(
                        "wrong value in write acknowledgement: sent [{}], received [{}]",
                        format_hex_compact(&request[2..4]),
                        format_hex_compact(&payload[2..4])
                    )));
                }
            }
            _ => {
                let count = u16::from_be_bytes([payload[2], payload[3]]);
                if count != self.count() {
                    return Err(invalid_response(format!(
                        "wrong number of {} in write acknowledgement: expected {}, received {count}",
                        if self.format.is_bit_format() { "bits" } else { "registers" },
                        self.count()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_register_request() {
        let cmd = Command::new(3, 289, PayloadFormat::Register);
        assert_eq!(cmd.build_request().unwrap(), vec![0x01, 0x21, 0x00, 0x01]);
    }

    #[test]
    fn test_write_register_fc16_request() {
        let cmd = Command::new(16, 35, PayloadFormat::Register).with_value(WriteValue::Number(20.0));
        assert_eq!(
            cmd.build_request().unwrap(),
            vec![0x00, 0x23, 0x00, 0x01, 0x02, 0x00, 0x14]
        );
    }

    #[test]
    fn test_write_register_fc6_request() {
        let cmd = Command::new(6, 35, PayloadFormat::Register)
            .with_value(WriteValue::Number(-1.5))
            .with_decimals(1)
            .with_signed(true);
        assert_eq!(cmd.build_request().unwrap(), vec![0x00, 0x23, 0xFF, 0xF1]);
    }

    #[test]
    fn test_write_coil_request() {
        let on = Command::new(5, 10, PayloadFormat::Bit).with_value(WriteValue::Bit(1));
        assert_eq!(on.build_request().unwrap(), vec![0x00, 0x0A, 0xFF, 0x00]);
        let off = Command::new(5, 10, PayloadFormat::Bit).with_value(WriteValue::Bit(0));
        assert_eq!(off.build_request().unwrap(), vec![0x00, 0x0A, 0x00, 0x00]);
    }

    #[test]
    fn test_write_multiple_coils_request() {
        let bits = vec![1, 0, 1, 1, 0, 0, 1, 1, 1, 0];
        let cmd = Command::new(15, 0x13, PayloadFormat::Bits)
            .with_bits(10)
            .with_value(WriteValue::Bits(bits));
        assert_eq!(
            cmd.build_request().unwrap(),
            vec![0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01]
        );
    }

    #[test]
    fn test_write_string_request() {
        let cmd = Command::new(16, 0, PayloadFormat::String)
            .with_registers(2)
            .with_value(WriteValue::Text("AB".to_string()));
        assert_eq!(
            cmd.build_request().unwrap(),
            vec![0x00, 0x00, 0x00, 0x02, 0x04, b'A', b'B', b' ', b' ']
        );
    }

    #[test]
    fn test_validation_rejects_bad_combinations() {
        // Register format with a coil function
        assert!(Command::new(1, 0, PayloadFormat::Register).validate().is_err());
        // fc 6 only writes a single register
        assert!(Command::new(6, 0, PayloadFormat::Long)
            .with_value(WriteValue::Integer(1))
            .validate()
            .is_err());
        // Decimals outside the register format
        assert!(Command::new(3, 0, PayloadFormat::Long).with_decimals(1).validate().is_err());
        assert!(Command::new(3, 0, PayloadFormat::Register).with_decimals(11).validate().is_err());
        // Counts
        assert!(Command::new(3, 0, PayloadFormat::Registers).with_registers(126).validate().is_err());
        assert!(Command::new(3, 0, PayloadFormat::Registers).with_registers(125).validate().is_ok());
        assert!(Command::new(16, 0, PayloadFormat::Registers)
            .with_registers(124)
            .with_value(WriteValue::Registers(vec![0; 124]))
            .validate()
            .is_err());
        assert!(Command::new(1, 0, PayloadFormat::Bits).with_bits(2001).validate().is_err());
        assert!(Command::new(3, 0, PayloadFormat::Float).with_registers(3).validate().is_err());
        // Reads carry no value
        assert!(Command::new(3, 0, PayloadFormat::Register)
            .with_value(WriteValue::Number(1.0))
            .validate()
            .is_err());
        // Writes need one
        assert!(Command::new(16, 0, PayloadFormat::Register).validate().is_err());
    }

    #[test]
    fn test_wrong_value_kind_is_type_mismatch() {
        let err = Command::new(16, 0, PayloadFormat::String)
            .with_registers(2)
            .with_value(WriteValue::Number(1.0))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ModbusError::TypeMismatch(_)));
    }

    #[test]
    fn test_parse_read_register() {
        let cmd = Command::new(3, 289, PayloadFormat::Register);
        assert_eq!(cmd.parse_response(&[0x02, 0x03, 0x02]).unwrap(), Value::Float(770.0));
        let scaled = cmd.clone().with_decimals(1);
        assert_eq!(scaled.parse_response(&[0x02, 0x03, 0x02]).unwrap(), Value::Float(77.0));
    }

    #[test]
    fn test_parse_byte_count_mismatch() {
        let cmd = Command::new(3, 0, PayloadFormat::Register);
        // Field says 4, only 2 bytes follow
        assert!(matches!(
            cmd.parse_response(&[0x04, 0x03, 0x02]),
            Err(ModbusError::InvalidResponse(_))
        ));
        // Consistent field, but two registers where one was asked for
        assert!(matches!(
            cmd.parse_response(&[0x04, 0x00, 0x01, 0x00, 0x02]),
            Err(ModbusError::InvalidResponse(_))
        ));
        assert!(cmd.parse_response(&[]).is_err());
    }

    #[test]
    fn test_parse_bits_and_text() {
        let bits = Command::new(2, 0, PayloadFormat::Bits).with_bits(10);
        assert_eq!(
            bits.parse_response(&[0x02, 0xCD, 0x01]).unwrap(),
            Value::Bits(vec![1, 0, 1, 1, 0, 0, 1, 1, 1, 0])
        );

        let text = Command::new(3, 0, PayloadFormat::String).with_registers(2);
        assert_eq!(
            text.parse_response(&[0x04, b'O', b'K', b' ', 0x00]).unwrap(),
            Value::Text("OK".to_string())
        );
        assert!(matches!(
            text.parse_response(&[0x04, 0xC3, 0xA9, b' ', b' ']),
            Err(ModbusError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_write_acknowledgement() {
        let cmd = Command::new(16, 35, PayloadFormat::Register).with_value(WriteValue::Number(20.0));
        assert_eq!(cmd.parse_response(&[0x00, 0x23, 0x00, 0x01]).unwrap(), Value::None);

        let err = cmd.parse_response(&[0x00, 0x24, 0x00, 0x01]).unwrap_err();
        assert!(err.to_string().contains("address"));
        let err = cmd.parse_response(&[0x00, 0x23, 0x00, 0x02]).unwrap_err();
        assert!(err.to_string().contains("number of registers"));
        assert!(cmd.parse_response(&[0x00, 0x23, 0x00]).is_err());
    }

    #[test]
    fn test_parse_single_write_echo() {
        let cmd = Command::new(5, 10, PayloadFormat::Bit).with_value(WriteValue::Bit(1));
        assert!(cmd.parse_response(&[0x00, 0x0A, 0xFF, 0x00]).is_ok());
        let err = cmd.parse_response(&[0x00, 0x0A, 0x00, 0x00]).unwrap_err();
        assert!(err.to_string().contains("value"));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(5).as_f64(), Some(5.0));
        assert_eq!(Value::Float(1.5).as_i64(), None);
        assert_eq!(Value::Int(i128::from(u64::MAX)).as_i64(), None);
        assert_eq!(Value::Int(i128::from(u64::MAX)).as_i128(), Some(i128::from(u64::MAX)));
        assert_eq!(Value::Text("x".into()).as_text(), Some("x"));
        assert_eq!(Value::Registers(vec![1]).into_registers(), Some(vec![1]));
        assert_eq!(Value::None.to_string(), "(none)");
    }
}
