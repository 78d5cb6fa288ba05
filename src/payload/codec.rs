//! # Modbus Data Encoding and Decoding
//!
//! Pure conversions between register images (big-endian byte strings as carried
//! in Modbus payloads) and domain values: scaled 16-bit registers, 32/64-bit
//! integers, IEEE-754 floats, fixed-width text, register arrays and bit arrays.
//!
//! Multi-register numbers are assembled in one of the four [`ByteOrder`]s used by
//! field devices. Nothing in this module performs I/O.

use crate::constants::MODBUS_MAX_DECIMALS;
use crate::error::ModbusError;
use nom::{
    multi::many1,
    number::complete::{be_f32, be_f64, be_u16},
    IResult,
};
use serde::{Deserialize, Serialize};

/// Arrangement of the bytes of a multi-register value on the wire.
///
/// Shown for the 32-bit value with big-endian bytes `A B C D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// `A B C D`, most significant register first.
    #[default]
    Big,
    /// `D C B A`
    Little,
    /// `B A D C`, bytes swapped inside each register.
    BigSwap,
    /// `C D A B`, registers reversed.
    LittleSwap,
}

impl ByteOrder {
    /// Convert between the big-endian image and the wire order.
    ///
    /// Every variant is an involution, so the same call serves both directions.
    pub fn arrange(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            ByteOrder::Big => bytes.to_vec(),
            ByteOrder::Little => bytes.iter().rev().copied().collect(),
            ByteOrder::BigSwap => swap_register_bytes(bytes),
            ByteOrder::LittleSwap => {
                let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
                swap_register_bytes(&reversed)
            }
        }
    }
}

fn swap_register_bytes(bytes: &[u8]) -> Vec<u8> {
    bytes
        .chunks(2)
        .flat_map(|pair| pair.iter().rev().copied())
        .collect()
}

fn invalid(msg: impl Into<String>) -> ModbusError {
    ModbusError::InvalidArgument(msg.into())
}

fn check_decimals(number_of_decimals: u8) -> Result<(), ModbusError> {
    if number_of_decimals > MODBUS_MAX_DECIMALS {
        return Err(invalid(format!(
            "number of decimals must be 0..={MODBUS_MAX_DECIMALS}, got {number_of_decimals}"
        )));
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Integers
// ----------------------------------------------------------------------------

/// Encode an unsigned integer big-endian into exactly `width` bytes.
pub fn int_to_bytes(value: u64, width: usize) -> Result<Vec<u8>, ModbusError> {
    if width == 0 || width > 8 {
        return Err(invalid(format!("byte width must be 1..=8, got {width}")));
    }
    if width < 8 && value >> (8 * width) != 0 {
        return Err(invalid(format!(
            "value {value} does not fit in {width} byte(s)"
        )));
    }
    Ok(value.to_be_bytes()[8 - width..].to_vec())
}

/// Decode big-endian bytes to an integer.
///
/// With `signed` the value is interpreted as two's complement over the full
/// width of the byte span.
pub fn bytes_to_int(bytes: &[u8], signed: bool) -> Result<i64, ModbusError> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(invalid(format!(
            "expected 1..=8 bytes for an integer, got {}",
            bytes.len()
        )));
    }
    let raw = bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    if signed {
        from_twos_complement(raw, 8 * bytes.len() as u32)
    } else if bytes.len() == 8 && raw > i64::MAX as u64 {
        Err(invalid(format!("unsigned value {raw} exceeds i64")))
    } else {
        Ok(raw as i64)
    }
}

/// Convert a signed value into its two's complement bit pattern of `bits` width.
pub fn to_twos_complement(x: i64, bits: u32) -> Result<u64, ModbusError> {
    if bits == 0 || bits > 64 {
        return Err(invalid(format!("bit width must be 1..=64, got {bits}")));
    }
    let min = if bits == 64 { i64::MIN } else { -(1i64 << (bits - 1)) };
    let max = if bits == 64 { i64::MAX } else { (1i64 << (bits - 1)) - 1 };
    if x < min || x > max {
        return Err(invalid(format!(
            "value {x} out of range {min}..={max} for {bits}-bit two's complement"
        )));
    }
    let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    Ok((x as u64) & mask)
}

/// Interpret a `bits` wide bit pattern as a two's complement signed value.
pub fn from_twos_complement(x: u64, bits: u32) -> Result<i64, ModbusError> {
    if bits == 0 || bits > 64 {
        return Err(invalid(format!("bit width must be 1..=64, got {bits}")));
    }
    if bits < 64 && x >> bits != 0 {
        return Err(invalid(format!("value {x} does not fit in {bits} bits")));
    }
    if bits == 64 {
        return Ok(x as i64);
    }
    let sign_bit = 1u64 << (bits - 1);
    if x & sign_bit == 0 {
        Ok(x as i64)
    } else {
        Ok((i128::from(x) - (1i128 << bits)) as i64)
    }
}

// ----------------------------------------------------------------------------
// Single registers
// ----------------------------------------------------------------------------

/// Encode a value into one register, scaled by `10^number_of_decimals`.
///
/// The scaled value is truncated toward zero and must fit in u16, or in i16
/// when `signed`.
pub fn encode_register(
    value: f64,
    number_of_decimals: u8,
    signed: bool,
) -> Result<[u8; 2], ModbusError> {
    check_decimals(number_of_decimals)?;
    if !value.is_finite() {
        return Err(invalid(format!("register value must be finite, got {value}")));
    }
    let scaled = (value * 10f64.powi(i32::from(number_of_decimals))).trunc();
    let (min, max) = if signed {
        (f64::from(i16::MIN), f64::from(i16::MAX))
    } else {
        (0.0, f64::from(u16::MAX))
    };
    if scaled < min || scaled > max {
        return Err(invalid(format!(
            "value {value} with {number_of_decimals} decimal(s) is out of range {min}..={max}"
        )));
    }
    let raw = if signed {
        to_twos_complement(scaled as i64, 16)? as u16
    } else {
        scaled as u16
    };
    Ok(raw.to_be_bytes())
}

/// Decode one register (exactly 2 bytes) and divide by `10^number_of_decimals`.
pub fn decode_register(
    bytes: &[u8],
    number_of_decimals: u8,
    signed: bool,
) -> Result<f64, ModbusError> {
    check_decimals(number_of_decimals)?;
    if bytes.len() != 2 {
        return Err(invalid(format!(
            "a register is 2 bytes, got {}",
            bytes.len()
        )));
    }
    let raw = bytes_to_int(bytes, signed)?;
    Ok(raw as f64 / 10f64.powi(i32::from(number_of_decimals)))
}

// ----------------------------------------------------------------------------
// Long integers
// ----------------------------------------------------------------------------

fn check_wide_registers(number_of_registers: u16, what: &str) -> Result<usize, ModbusError> {
    match number_of_registers {
        2 => Ok(4),
        4 => Ok(8),
        n => Err(invalid(format!(
            "a {what} spans 2 or 4 registers, got {n}"
        ))),
    }
}

/// Encode a 32-bit (2 registers) or 64-bit (4 registers) integer.
///
/// The value is taken as `i128` so that both the signed and the unsigned
/// 64-bit range can be written.
pub fn encode_long(
    value: i128,
    signed: bool,
    number_of_registers: u16,
    byte_order: ByteOrder,
) -> Result<Vec<u8>, ModbusError> {
    let width = check_wide_registers(number_of_registers, "long")?;
    let bits = 8 * width as u32;
    let raw = if signed {
        let value = i64::try_from(value)
            .map_err(|_| invalid(format!("value {value} out of range for a signed {bits}-bit long")))?;
        to_twos_complement(value, bits)?
    } else {
        u64::try_from(value)
            .map_err(|_| invalid(format!("value {value} out of range for an unsigned long")))?
    };
    let image = int_to_bytes(raw, width)?;
    Ok(byte_order.arrange(&image))
}

/// Decode a 4-byte or 8-byte integer in the given byte order.
///
/// Unsigned 64-bit values above `i64::MAX` are returned intact.
pub fn decode_long(bytes: &[u8], signed: bool, byte_order: ByteOrder) -> Result<i128, ModbusError> {
    if bytes.len() != 4 && bytes.len() != 8 {
        return Err(invalid(format!(
            "a long is 4 or 8 bytes, got {}",
            bytes.len()
        )));
    }
    let image = byte_order.arrange(bytes);
    if signed {
        return bytes_to_int(&image, true).map(i128::from);
    }
    let raw = image.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Ok(i128::from(raw))
}

// ----------------------------------------------------------------------------
// Floats
// ----------------------------------------------------------------------------

/// Encode an IEEE-754 single (2 registers) or double (4 registers).
///
/// Magnitudes beyond f32 saturate to infinity, as the IEEE-754 rounding rules do.
pub fn encode_float(
    value: f64,
    number_of_registers: u16,
    byte_order: ByteOrder,
) -> Result<Vec<u8>, ModbusError> {
    let width = check_wide_registers(number_of_registers, "float")?;
    let image = if width == 4 {
        (value as f32).to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    };
    Ok(byte_order.arrange(&image))
}

/// Decode a 4-byte single or 8-byte double. Every bit pattern is accepted.
pub fn decode_float(bytes: &[u8], byte_order: ByteOrder) -> Result<f64, ModbusError> {
    let image = byte_order.arrange(bytes);
    let parsed: IResult<&[u8], f64> = match image.len() {
        4 => be_f32(image.as_slice()).map(|(rest, v)| (rest, f64::from(v))),
        8 => be_f64(image.as_slice()),
        n => return Err(invalid(format!("a float is 4 or 8 bytes, got {n}"))),
    };
    parsed
        .map(|(_, value)| value)
        .map_err(|e| invalid(format!("float decoding failed: {e}")))
}

// ----------------------------------------------------------------------------
// Text
// ----------------------------------------------------------------------------

/// Encode ASCII text into `number_of_registers` registers, space padded.
pub fn encode_text(text: &str, number_of_registers: u16) -> Result<Vec<u8>, ModbusError> {
    if number_of_registers == 0 {
        return Err(invalid("a string needs at least one register"));
    }
    if !text.is_ascii() {
        return Err(invalid(format!("string {text:?} is not ASCII")));
    }
    let capacity = 2 * usize::from(number_of_registers);
    if text.len() > capacity {
        return Err(invalid(format!(
            "string of {} characters exceeds {capacity} characters ({number_of_registers} registers)",
            text.len()
        )));
    }
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(capacity, b' ');
    Ok(bytes)
}

/// Decode register text, dropping trailing spaces and NULs.
///
/// Bytes map one-to-one to chars (Latin-1), so device text such as `°C` survives.
pub fn decode_text(bytes: &[u8]) -> Result<String, ModbusError> {
    let text: String = bytes.iter().map(|b| char::from(*b)).collect();
    Ok(text.trim_end_matches([' ', '\0']).to_string())
}

// ----------------------------------------------------------------------------
// Register arrays
// ----------------------------------------------------------------------------

/// Encode raw register values big-endian.
pub fn encode_registers(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn parse_registers(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    many1(be_u16)(input)
}

/// Decode a non-empty, even-length byte string into register values.
pub fn decode_registers(bytes: &[u8]) -> Result<Vec<u16>, ModbusError> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return Err(invalid(format!(
            "register data must be a non-empty even number of bytes, got {}",
            bytes.len()
        )));
    }
    let (_, values) =
        parse_registers(bytes).map_err(|e| invalid(format!("register decoding failed: {e}")))?;
    Ok(values)
}

// ----------------------------------------------------------------------------
// Bits
// ----------------------------------------------------------------------------

/// Number of bytes needed to carry `number_of_bits` bits.
pub fn bytes_for_bits(number_of_bits: u16) -> usize {
    usize::from(number_of_bits).div_ceil(8)
}

/// Pack bits (each 0 or 1) least significant bit first.
pub fn encode_bits(bits: &[u8]) -> Result<Vec<u8>, ModbusError> {
    if let Some(bad) = bits.iter().find(|b| **b > 1) {
        return Err(invalid(format!("bit values must be 0 or 1, got {bad}")));
    }
    Ok(bits
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, bit)| acc | (bit << i))
        })
        .collect())
}

/// Unpack `number_of_bits` bits; the byte count must match exactly.
pub fn decode_bits(bytes: &[u8], number_of_bits: u16) -> Result<Vec<u8>, ModbusError> {
    if number_of_bits == 0 {
        return Err(invalid("number of bits must be at least 1"));
    }
    let expected = bytes_for_bits(number_of_bits);
    if bytes.len() != expected {
        return Err(invalid(format!(
            "{number_of_bits} bit(s) need {expected} byte(s), got {}",
            bytes.len()
        )));
    }
    Ok((0..usize::from(number_of_bits))
        .map(|i| (bytes[i / 8] >> (i % 8)) & 0x01)
        .collect())
}
