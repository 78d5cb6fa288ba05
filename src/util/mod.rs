//! # Utility Modules
//!
//! Hex encoding/decoding and frame logging helpers used throughout the
//! modbus-rs crate.

pub mod hex;
pub mod logging;

// Re-export commonly used types and functions
pub use hex::{decode_hex, encode_hex_upper, format_hex_compact, hex_to_bytes, HexError};
pub use logging::{describe_bytes, log_frame_hex};
