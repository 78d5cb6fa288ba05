//! # modbus-rs - A Rust Crate for Modbus RTU and ASCII Serial Communication
//!
//! The modbus-rs crate implements the master side of the Modbus serial protocol.
//! It talks to field instruments (PLCs, meters, temperature controllers) over
//! RS-232/RS-485 lines in both the binary RTU and the hex text ASCII transmission
//! modes.
//!
//! ## Features
//!
//! - Read and write coils, discrete inputs, holding and input registers
//! - Scaled and signed registers, 32/64-bit integers, IEEE-754 floats, text
//!   and register arrays in any of the common byte orders
//! - CRC-16 and LRC framing with full response validation
//! - Exact response size prediction for bounded reads
//! - Local echo handling, broadcast writes and the inter-frame silent period
//! - A mock transport for deterministic tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use modbus_rs::{Instrument, SerialConfig, SerialPortTransport, TransmissionMode};
//!
//! let port = SerialPortTransport::connect("/dev/ttyUSB0", SerialConfig::default())?;
//! let mut instrument = Instrument::new(port, 1, TransmissionMode::Rtu);
//! let temperature = instrument.read_register(289, 1, 3, false)?;
//! println!("temperature: {temperature}");
//! # Ok::<(), modbus_rs::ModbusError>(())
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod modbus;
pub mod payload;
pub mod util;

pub use crate::config::InstrumentConfig;
pub use crate::error::{ExceptionCode, ModbusError};
pub use crate::instrument::Instrument;
pub use crate::logging::{init_logger, init_logger_with_level, log_info};

// Serial line layer
pub use modbus::{
    MockSerialPort, Parity, SerialConfig, SerialPortTransport, SerialTransport, SessionConfig,
    SharedTransport, TransactionEngine, TransactionState, TransmissionMode,
};

// Payload layer
pub use payload::{ByteOrder, Command, PayloadFormat, Value, WriteValue};
