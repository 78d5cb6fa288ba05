//! Response size prediction.
//!
//! For the supported function codes the length of a well-formed response follows
//! from the request alone. Knowing it lets the transaction engine issue a single
//! bounded read instead of waiting for the transport timeout on every call.

use crate::constants::{
    MODBUS_FC_READ_COILS, MODBUS_FC_READ_DISCRETE_INPUTS, MODBUS_FC_READ_HOLDING_REGISTERS,
    MODBUS_FC_READ_INPUT_REGISTERS, MODBUS_FC_WRITE_MULTIPLE_COILS,
    MODBUS_FC_WRITE_MULTIPLE_REGISTERS, MODBUS_FC_WRITE_SINGLE_COIL,
    MODBUS_FC_WRITE_SINGLE_REGISTER,
};
use crate::error::ModbusError;
use crate::modbus::frame::TransmissionMode;
use crate::payload::codec::bytes_for_bits;

/// Register or bit address followed by a count or value.
const REQUEST_PREFIX_LENGTH: usize = 4;

/// Acknowledgement of a write: echoed address plus count or value.
const WRITE_ACK_PAYLOAD_LENGTH: usize = 4;

/// Number of payload bytes in the response to a request payload.
pub fn predict_response_payload_size(
    function_code: u8,
    request_payload: &[u8],
) -> Result<usize, ModbusError> {
    if request_payload.len() < REQUEST_PREFIX_LENGTH {
        return Err(ModbusError::InvalidArgument(format!(
            "request payload of {} byte(s) is too short to hold an address and count",
            request_payload.len()
        )));
    }
    let count = u16::from_be_bytes([request_payload[2], request_payload[3]]);

    match function_code {
        MODBUS_FC_READ_COILS | MODBUS_FC_READ_DISCRETE_INPUTS => Ok(1 + bytes_for_bits(count)),
        MODBUS_FC_READ_HOLDING_REGISTERS | MODBUS_FC_READ_INPUT_REGISTERS => {
            Ok(1 + 2 * usize::from(count))
        }
        MODBUS_FC_WRITE_SINGLE_COIL
        | MODBUS_FC_WRITE_SINGLE_REGISTER
        | MODBUS_FC_WRITE_MULTIPLE_COILS
        | MODBUS_FC_WRITE_MULTIPLE_REGISTERS => Ok(WRITE_ACK_PAYLOAD_LENGTH),
        other => Err(ModbusError::InvalidArgument(format!(
            "cannot predict the response size for function code {other}"
        ))),
    }
}

/// Number of wire bytes in the response to `request_payload`, framing included.
pub fn predict_response_size(
    mode: TransmissionMode,
    function_code: u8,
    request_payload: &[u8],
) -> Result<usize, ModbusError> {
    let payload = predict_response_payload_size(function_code, request_payload)?;
    Ok(mode.frame_length(payload))
}
