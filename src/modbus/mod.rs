//! The modbus module contains the serial line layer of the protocol: checksums,
//! RTU/ASCII framing, response size prediction, the transport seam and the
//! transaction engine that drives one request/response exchange.

pub mod checksum;
pub mod frame;
pub mod serial;
pub mod serial_mock;
pub mod size;
pub mod transaction;

pub use checksum::{crc16, crc16_bytes, lrc};
pub use frame::{embed_payload, extract_payload, TransmissionMode};
pub use serial::{
    minimum_silent_period, Parity, SerialConfig, SerialPortTransport, SerialTransport,
    SharedTransport,
};
pub use serial_mock::MockSerialPort;
pub use size::predict_response_size;
pub use transaction::{SessionConfig, TransactionEngine, TransactionState};
