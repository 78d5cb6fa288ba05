//! # Modbus Serial Frame Codec
//!
//! This module wraps a function code and payload into a complete slave-addressed
//! frame for either serial transmission mode, and extracts the payload back out
//! of a response frame after checking its integrity.
//!
//! ## Frame layouts
//!
//! ```text
//! RTU:   [address][function][payload ...][crc lo][crc hi]
//! ASCII: ':' hex(address function payload ...) hex(lrc) '\r' '\n'
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use modbus_rs::modbus::frame::{embed_payload, extract_payload, TransmissionMode};
//!
//! let request = embed_payload(1, TransmissionMode::Rtu, 3, &[0x01, 0x21, 0x00, 0x01]).unwrap();
//! assert_eq!(request, [0x01, 0x03, 0x01, 0x21, 0x00, 0x01, 0xD5, 0xFC]);
//!
//! let response = [0x01, 0x03, 0x02, 0x03, 0x02, 0x39, 0x75];
//! let payload = extract_payload(&response, 1, TransmissionMode::Rtu, 3).unwrap();
//! assert_eq!(payload, [0x02, 0x03, 0x02]);
//! ```
//!
//! ## Error Handling
//! Integrity failures (length, envelope, checksum, address, function code) are
//! reported as `ModbusError::InvalidResponse`. An exception response from the
//! slave is decoded into `ModbusError::SlaveReported`.

use crate::constants::{
    MODBUS_ASCII_END, MODBUS_ASCII_MIN_RESPONSE_LENGTH, MODBUS_ASCII_START, MODBUS_CRC_LENGTH,
    MODBUS_EXCEPTION_MASK, MODBUS_FC_MAX, MODBUS_HEADER_LENGTH, MODBUS_LRC_LENGTH,
    MODBUS_RTU_MIN_RESPONSE_LENGTH,
};
use crate::error::{ExceptionCode, ModbusError};
use crate::modbus::checksum::{crc16, crc16_bytes, lrc, lrc_hex};
use crate::util::hex::{decode_hex_bytes, encode_hex_upper, format_hex_compact};
use bytes::{BufMut, BytesMut};
use nom::{
    bytes::complete::{tag, take_until},
    combinator::{all_consuming, rest},
    number::complete::be_u8,
    sequence::{delimited, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serial transmission mode of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionMode {
    /// Binary frames protected by CRC-16.
    #[default]
    Rtu,
    /// Hex text frames protected by LRC.
    Ascii,
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmissionMode::Rtu => write!(f, "rtu"),
            TransmissionMode::Ascii => write!(f, "ascii"),
        }
    }
}

impl std::str::FromStr for TransmissionMode {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rtu" => Ok(TransmissionMode::Rtu),
            "ascii" => Ok(TransmissionMode::Ascii),
            other => Err(ModbusError::InvalidArgument(format!(
                "unknown transmission mode {other:?}, expected rtu or ascii"
            ))),
        }
    }
}

impl TransmissionMode {
    /// Shortest structurally valid response in this mode.
    pub fn min_response_length(&self) -> usize {
        match self {
            TransmissionMode::Rtu => MODBUS_RTU_MIN_RESPONSE_LENGTH,
            TransmissionMode::Ascii => MODBUS_ASCII_MIN_RESPONSE_LENGTH,
        }
    }

    /// Number of wire bytes for a frame carrying `payload_len` payload bytes.
    pub fn frame_length(&self, payload_len: usize) -> usize {
        let raw = MODBUS_HEADER_LENGTH + payload_len;
        match self {
            TransmissionMode::Rtu => raw + MODBUS_CRC_LENGTH,
            TransmissionMode::Ascii => {
                1 + 2 * (raw + MODBUS_LRC_LENGTH) + MODBUS_ASCII_END.len()
            }
        }
    }
}

fn check_function_code(function_code: u8) -> Result<(), ModbusError> {
    if function_code == 0 || function_code > MODBUS_FC_MAX {
        return Err(ModbusError::InvalidArgument(format!(
            "function code must be 1..={MODBUS_FC_MAX}, got {function_code}"
        )));
    }
    Ok(())
}

/// Builds the complete request frame for `slave_address`.
pub fn embed_payload(
    slave_address: u8,
    mode: TransmissionMode,
    function_code: u8,
    payload: &[u8],
) -> Result<Vec<u8>, ModbusError> {
    check_function_code(function_code)?;

    let mut pdu = BytesMut::with_capacity(MODBUS_HEADER_LENGTH + payload.len());
    pdu.put_u8(slave_address);
    pdu.put_u8(function_code);
    pdu.put_slice(payload);

    let mut frame = BytesMut::with_capacity(mode.frame_length(payload.len()));
    match mode {
        TransmissionMode::Rtu => {
            frame.put_slice(&pdu);
            frame.put_slice(&crc16_bytes(&pdu));
        }
        TransmissionMode::Ascii => {
            frame.put_u8(MODBUS_ASCII_START);
            frame.put_slice(encode_hex_upper(&pdu).as_bytes());
            frame.put_slice(lrc_hex(&pdu).as_bytes());
            frame.put_slice(MODBUS_ASCII_END);
        }
    }
    Ok(frame.to_vec())
}

/// Splits the `:` ... `\r\n` envelope, yielding the hex characters inside.
fn parse_ascii_envelope(input: &[u8]) -> IResult<&[u8], &[u8]> {
    all_consuming(delimited(
        tag(&[MODBUS_ASCII_START][..]),
        take_until(MODBUS_ASCII_END),
        tag(MODBUS_ASCII_END),
    ))(input)
}

/// Splits a checked frame body into address, function code and the rest.
fn parse_header(input: &[u8]) -> IResult<&[u8], (u8, u8, &[u8])> {
    tuple((be_u8, be_u8, rest))(input)
}

fn invalid_response(msg: impl Into<String>) -> ModbusError {
    ModbusError::InvalidResponse(msg.into())
}

/// Checks the RTU CRC and returns the frame without it.
fn strip_rtu_checksum(response: &[u8]) -> Result<&[u8], ModbusError> {
    let (body, received) = response.split_at(response.len() - MODBUS_CRC_LENGTH);
    let received = u16::from_le_bytes([received[0], received[1]]);
    let calculated = crc16(body);
    if received != calculated {
        return Err(invalid_response(format!(
            "CRC mismatch: received 0x{received:04X}, calculated 0x{calculated:04X} for [{}]",
            format_hex_compact(response)
        )));
    }
    Ok(body)
}

/// Checks the ASCII envelope and LRC and returns the decoded frame without LRC.
fn strip_ascii_checksum(response: &[u8]) -> Result<Vec<u8>, ModbusError> {
    let (_, hex_chars) = parse_ascii_envelope(response).map_err(|_| {
        invalid_response(format!(
            "malformed ASCII envelope, expected ':' ... '\\r\\n': {:?}",
            response.escape_ascii().to_string()
        ))
    })?;
    let mut decoded = decode_hex_bytes(hex_chars)
        .map_err(|e| invalid_response(format!("bad hex in ASCII response: {e}")))?;
    if decoded.len() < MODBUS_HEADER_LENGTH + MODBUS_LRC_LENGTH {
        return Err(invalid_response(format!(
            "ASCII response too short: {} byte(s) after hex decoding",
            decoded.len()
        )));
    }
    let received = decoded.pop().unwrap_or_default();
    let calculated = lrc(&decoded);
    if received != calculated {
        return Err(invalid_response(format!(
            "LRC mismatch: received 0x{received:02X}, calculated 0x{calculated:02X}"
        )));
    }
    Ok(decoded)
}

/// Validates a response frame and returns its payload.
///
/// Broadcast requests never reach this point; the transaction engine does not
/// read a response for them.
pub fn extract_payload(
    response: &[u8],
    slave_address: u8,
    mode: TransmissionMode,
    function_code: u8,
) -> Result<Vec<u8>, ModbusError> {
    check_function_code(function_code)?;

    if response.len() < mode.min_response_length() {
        return Err(invalid_response(format!(
            "response too short: {} byte(s), minimum is {} in {mode} mode: [{}]",
            response.len(),
            mode.min_response_length(),
            format_hex_compact(response)
        )));
    }

    let body = match mode {
        TransmissionMode::Rtu => strip_rtu_checksum(response)?.to_vec(),
        TransmissionMode::Ascii => strip_ascii_checksum(response)?,
    };

    let (_, (address, received_function, payload)) = parse_header(&body)
        .map_err(|_| invalid_response("response has no address and function code"))?;

    if address != slave_address {
        return Err(invalid_response(format!(
            "wrong slave address: expected {slave_address}, received {address}"
        )));
    }

    if received_function == function_code | MODBUS_EXCEPTION_MASK {
        let code = payload.first().copied().ok_or_else(|| {
            invalid_response("exception response carries no exception code")
        })?;
        return Err(ModbusError::SlaveReported {
            function_code,
            code: ExceptionCode::from(code),
        });
    }

    if received_function != function_code {
        return Err(invalid_response(format!(
            "wrong function code: expected {function_code}, received {received_function}"
        )));
    }

    Ok(payload.to_vec())
}
