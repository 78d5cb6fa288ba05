//! Modbus Protocol Constants
//!
//! This module defines constants used in the Modbus serial line implementation,
//! based on the Modbus Application Protocol v1.1b3 and the Modbus over Serial
//! Line v1.02 specifications.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Addressing
// ----------------------------------------------------------------------------

/// Slave address reserved for broadcast requests (no response).
pub const MODBUS_BROADCAST_ADDRESS: u8 = 0;

// ----------------------------------------------------------------------------
// Function codes
// ----------------------------------------------------------------------------

pub const MODBUS_FC_READ_COILS: u8 = 0x01;
pub const MODBUS_FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const MODBUS_FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const MODBUS_FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const MODBUS_FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const MODBUS_FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const MODBUS_FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const MODBUS_FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Highest function code a request may carry; bit 7 flags exceptions.
pub const MODBUS_FC_MAX: u8 = 0x7F;

/// Bit set in the function code of an exception response.
pub const MODBUS_EXCEPTION_MASK: u8 = 0x80;

// Coil values for function code 5
pub const MODBUS_COIL_ON: u16 = 0xFF00;
pub const MODBUS_COIL_OFF: u16 = 0x0000;

// ----------------------------------------------------------------------------
// Per-request limits
// ----------------------------------------------------------------------------

pub const MODBUS_MAX_READ_REGISTERS: u16 = 125;
pub const MODBUS_MAX_WRITE_REGISTERS: u16 = 123;
pub const MODBUS_MAX_READ_BITS: u16 = 2000;
pub const MODBUS_MAX_WRITE_BITS: u16 = 1968;

/// Largest supported decimal scaling for single registers.
pub const MODBUS_MAX_DECIMALS: u8 = 10;

// ----------------------------------------------------------------------------
// Framing
// ----------------------------------------------------------------------------

/// Address byte plus function code byte.
pub const MODBUS_HEADER_LENGTH: usize = 2;
pub const MODBUS_CRC_LENGTH: usize = 2;
pub const MODBUS_LRC_LENGTH: usize = 1;

pub const MODBUS_ASCII_START: u8 = b':';
pub const MODBUS_ASCII_END: &[u8] = b"\r\n";

/// Shortest RTU frame: address, function code and CRC.
pub const MODBUS_RTU_MIN_RESPONSE_LENGTH: usize = 4;

/// Shortest ASCII frame: colon, address, function code, LRC and CRLF.
pub const MODBUS_ASCII_MIN_RESPONSE_LENGTH: usize = 9;

/// Upper bound for a read when the response size cannot be predicted.
pub const MODBUS_MAX_READ_BUFFER: usize = 1024;

// ----------------------------------------------------------------------------
// Timing
// ----------------------------------------------------------------------------

/// Start bit, 8 data bits, parity or second stop bit, stop bit.
pub const MODBUS_BITS_PER_CHARACTER: f64 = 11.0;

/// Minimum silence between frames, in character times.
pub const MODBUS_SILENT_CHARACTER_TIMES: f64 = 3.5;

/// Fixed inter-frame delay used at high baud rates.
pub const MODBUS_SILENT_PERIOD_FLOOR: Duration = Duration::from_micros(1750);

// ----------------------------------------------------------------------------
// Serial defaults
// ----------------------------------------------------------------------------

pub const MODBUS_DEFAULT_BAUDRATE: u32 = 19200;
pub const MODBUS_DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);
