//! Instrument configuration files.
//!
//! An [`InstrumentConfig`] names the serial port, the slave and every line and
//! session setting. Missing fields fall back to their defaults, so the smallest
//! valid file is `{"port": "/dev/ttyUSB0"}`.

use crate::error::ModbusError;
use crate::instrument::Instrument;
use crate::modbus::frame::TransmissionMode;
use crate::modbus::serial::{SerialConfig, SerialPortTransport};
use crate::modbus::transaction::SessionConfig;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

fn default_slave_address() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub port: String,
    #[serde(default = "default_slave_address")]
    pub slave_address: u8,
    #[serde(default)]
    pub mode: TransmissionMode,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl InstrumentConfig {
    pub fn new(port: &str) -> Self {
        InstrumentConfig {
            port: port.to_string(),
            slave_address: default_slave_address(),
            mode: TransmissionMode::default(),
            serial: SerialConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModbusError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!("Loaded instrument configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModbusError> {
        serde_json::from_str(text).map_err(|e| {
            ModbusError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid instrument configuration: {e}"),
            ))
        })
    }

    pub fn to_json_string(&self) -> Result<String, ModbusError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ModbusError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Builds an instrument on a real serial port.
    ///
    /// The port is opened right away unless the session opens it per call.
    pub fn connect(&self) -> Result<Instrument<SerialPortTransport>, ModbusError> {
        let transport = if self.session.close_port_after_each_call {
            SerialPortTransport::new(&self.port, self.serial.clone())
        } else {
            SerialPortTransport::connect(&self.port, self.serial.clone())?
        };
        Ok(Instrument::with_session(
            transport,
            self.slave_address,
            self.mode,
            self.session.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::serial::{Parity, SerialTransport};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_config() {
        let config = InstrumentConfig::from_json_str(r#"{"port": "/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(config, InstrumentConfig::new("/dev/ttyUSB0"));
        assert_eq!(config.slave_address, 1);
        assert_eq!(config.mode, TransmissionMode::Rtu);
    }

    #[test]
    fn test_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "port": "/dev/ttyS1",
                "slave_address": 17,
                "mode": "ascii",
                "serial": {{"baudrate": 9600, "parity": "even", "stop_bits": 1, "timeout_ms": 500}},
                "session": {{"handle_local_echo": true, "close_port_after_each_call": true}}
            }}"#
        )
        .unwrap();

        let config = InstrumentConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.slave_address, 17);
        assert_eq!(config.mode, TransmissionMode::Ascii);
        assert_eq!(config.serial.baudrate, 9600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.timeout, Duration::from_millis(500));
        assert!(config.session.handle_local_echo);
        assert!(config.session.precalculate_read_size);
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut config = InstrumentConfig::new("COM3");
        config.session.debug = true;
        let text = config.to_json_string().unwrap();
        assert_eq!(InstrumentConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        assert!(InstrumentConfig::from_json_str(r#"{"slave_address": 1}"#).is_err());
        assert!(InstrumentConfig::from_json_str(r#"{"port": "x", "mode": "tcp"}"#).is_err());
        assert!(InstrumentConfig::from_json_file("/nonexistent/modbus.json").is_err());
    }

    #[test]
    fn test_connect_deferred_open() {
        let mut config = InstrumentConfig::new("/dev/does-not-exist");
        config.session.close_port_after_each_call = true;
        let instrument = config.connect().unwrap();
        assert!(!instrument.transport().is_open());
    }
}
