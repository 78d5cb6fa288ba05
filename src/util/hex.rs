//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers shared by the ASCII transmission mode (which carries every byte
//! as two hex characters), debug logging of raw frames and test fixtures.
//!
//! ## Usage
//!
//! ```rust
//! use modbus_rs::util::hex::{encode_hex_upper, decode_hex, format_hex_compact};
//!
//! let data = [0x01, 0x03, 0x01, 0x21];
//! assert_eq!(encode_hex_upper(&data), "01030121");
//! assert_eq!(decode_hex("01030121").unwrap(), data);
//! assert_eq!(format_hex_compact(&data), "01 03 01 21");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Invalid hex character: {0:?}")]
    InvalidCharacter(char),

    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,
}

impl From<hex::FromHexError> for HexError {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, .. } => HexError::InvalidCharacter(c),
            hex::FromHexError::OddLength => HexError::OddLength(0),
            hex::FromHexError::InvalidStringLength => HexError::OddLength(0),
        }
    }
}

/// Encode bytes to an uppercase hex string, as required on the ASCII wire.
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string to bytes.
///
/// Accepts both uppercase and lowercase hex characters. Whitespace is stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    decode_hex_bytes(cleaned.as_bytes())
}

/// Decode raw hex characters (as read from the line) to bytes.
///
/// No whitespace is tolerated here; every byte must be a hex digit.
pub fn decode_hex_bytes(hex_chars: &[u8]) -> Result<Vec<u8>, HexError> {
    if hex_chars.len() % 2 != 0 {
        return Err(HexError::OddLength(hex_chars.len()));
    }
    hex::decode(hex_chars).map_err(HexError::from)
}

/// Format hex data for compact display (useful for logs)
///
/// Formats data as "01 03 02 03" with spaces between bytes.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Helper for creating test data from hex strings.
///
/// Panics on invalid hex (intended for test code only).
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    decode_hex(hex).expect("Invalid hex in test data")
}
