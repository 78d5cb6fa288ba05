//! # Modbus Error Handling
//!
//! This module defines the ModbusError enum, which represents the different error
//! types that can occur in the modbus-rs crate, together with the exception codes
//! a slave may report in an exception response.

use crate::util::hex::{format_hex_compact, HexError};
use thiserror::Error;

/// Exception codes carried by a slave exception response (function code | 0x80).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    NegativeAcknowledge,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Unknown(u8),
}

impl ExceptionCode {
    /// The raw code as sent on the wire.
    pub fn code(&self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::SlaveDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::SlaveDeviceBusy => 0x06,
            ExceptionCode::NegativeAcknowledge => 0x07,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x0A,
            ExceptionCode::GatewayTargetFailedToRespond => 0x0B,
            ExceptionCode::Unknown(code) => *code,
        }
    }

    /// Human readable description of the exception.
    pub fn description(&self) -> &'static str {
        match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::SlaveDeviceFailure => "slave device failure",
            ExceptionCode::Acknowledge => "acknowledge (request accepted, still processing)",
            ExceptionCode::SlaveDeviceBusy => "slave device busy",
            ExceptionCode::NegativeAcknowledge => "negative acknowledge",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetFailedToRespond => "gateway target device failed to respond",
            ExceptionCode::Unknown(_) => "unknown exception code",
        }
    }

    /// Whether re-issuing the same request later may succeed.
    ///
    /// Illegal-request codes point at a caller error and never succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExceptionCode::Acknowledge
                | ExceptionCode::SlaveDeviceBusy
                | ExceptionCode::NegativeAcknowledge
                | ExceptionCode::GatewayPathUnavailable
                | ExceptionCode::GatewayTargetFailedToRespond
        )
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::SlaveDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::SlaveDeviceBusy,
            0x07 => ExceptionCode::NegativeAcknowledge,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetFailedToRespond,
            other => ExceptionCode::Unknown(other),
        }
    }
}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.code())
    }
}

/// Represents the different error types that can occur in the Modbus crate.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// An argument is out of range or inconsistent with the other arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A value of the wrong kind was supplied for the requested payload format.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The transport returned no bytes before the timeout elapsed.
    #[error("No response from slave: {0}")]
    NoResponse(String),

    /// A response was received but failed structural validation.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The slave answered with a Modbus exception response.
    #[error("Slave reported exception for function code {function_code}: {code}")]
    SlaveReported { function_code: u8, code: ExceptionCode },

    /// The bytes read back from a half-duplex line differ from what was sent.
    #[error("Local echo mismatch: sent [{}], read back [{}]", format_hex_compact(.sent), format_hex_compact(.received))]
    LocalEcho { sent: Vec<u8>, received: Vec<u8> },

    /// Failure reported by the serial transport.
    #[error("Serial port error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed hexadecimal text.
    #[error("Hex error: {0}")]
    Hex(#[from] HexError),
}

impl ModbusError {
    /// Whether the caller may reasonably retry the same operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModbusError::NoResponse(_) => true,
            ModbusError::SlaveReported { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    /// The slave exception code, if this error is a slave exception response.
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            ModbusError::SlaveReported { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_code_roundtrip() {
        for raw in [1u8, 2, 3, 4, 5, 6, 7, 8, 10, 11] {
            let code = ExceptionCode::from(raw);
            assert!(!matches!(code, ExceptionCode::Unknown(_)), "code {raw}");
            assert_eq!(code.code(), raw);
        }
        assert_eq!(ExceptionCode::from(9), ExceptionCode::Unknown(9));
        assert_eq!(ExceptionCode::from(0x42).code(), 0x42);
    }

    #[test]
    fn test_retry_classification() {
        assert!(!ExceptionCode::IllegalFunction.is_retryable());
        assert!(!ExceptionCode::IllegalDataAddress.is_retryable());
        assert!(!ExceptionCode::IllegalDataValue.is_retryable());
        assert!(!ExceptionCode::SlaveDeviceFailure.is_retryable());
        assert!(ExceptionCode::SlaveDeviceBusy.is_retryable());
        assert!(ExceptionCode::NegativeAcknowledge.is_retryable());

        let busy = ModbusError::SlaveReported {
            function_code: 3,
            code: ExceptionCode::SlaveDeviceBusy,
        };
        assert!(busy.is_retryable());
        assert!(ModbusError::NoResponse("x".into()).is_retryable());
        assert!(!ModbusError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn test_local_echo_message() {
        let err = ModbusError::LocalEcho {
            sent: vec![0x01, 0x03],
            received: vec![0x01, 0x83],
        };
        assert_eq!(
            err.to_string(),
            "Local echo mismatch: sent [01 03], read back [01 83]"
        );
    }
}
