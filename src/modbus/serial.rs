//! # Modbus Serial Communication
//!
//! This module defines the transport seam of the crate. The transaction engine
//! talks to a [`SerialTransport`]; the real implementation drives a serial port
//! through the blocking `serialport` API re-exported by `tokio-serial`, tests use
//! [`crate::modbus::serial_mock::MockSerialPort`].

use crate::constants::{
    MODBUS_BITS_PER_CHARACTER, MODBUS_DEFAULT_BAUDRATE, MODBUS_DEFAULT_TIMEOUT,
    MODBUS_SILENT_CHARACTER_TIMES,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_serial::SerialPort as _;

/// Byte stream to a Modbus serial line.
///
/// `read` blocks for at most the configured timeout and returns whatever
/// arrived, which may be fewer than `max_bytes` bytes or nothing at all.
pub trait SerialTransport {
    /// Opens the port. Fails if it is already open.
    fn open(&mut self) -> io::Result<()>;

    /// Closes the port. Fails if it is already closed.
    fn close(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;

    /// Writes `data`, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Reads up to `max_bytes` bytes, waiting at most for the timeout.
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;

    fn baudrate(&self) -> u32;

    fn timeout(&self) -> Duration;

    /// When the line last carried a frame, in either direction.
    ///
    /// Kept with the transport so that every user of a shared line sees it.
    fn last_activity(&self) -> Option<Instant>;

    fn mark_activity(&mut self, at: Instant);

    /// Discards pending input and output.
    fn clear_buffers(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Short description used in logs and `Display` output.
    fn describe(&self) -> String {
        format!("serial transport @ {} baud", self.baudrate())
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn open(&mut self) -> io::Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        (**self).read(max_bytes)
    }

    fn baudrate(&self) -> u32 {
        (**self).baudrate()
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn last_activity(&self) -> Option<Instant> {
        (**self).last_activity()
    }

    fn mark_activity(&mut self, at: Instant) {
        (**self).mark_activity(at)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        (**self).clear_buffers()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Minimum silence before a new frame: 3.5 character times, never less than `floor`.
pub fn minimum_silent_period(baudrate: u32, floor: Duration) -> Duration {
    if baudrate == 0 {
        return floor;
    }
    let seconds = MODBUS_BITS_PER_CHARACTER * MODBUS_SILENT_CHARACTER_TIMES / f64::from(baudrate);
    Duration::from_secs_f64(seconds).max(floor)
}

/// Parity setting of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Configuration for serial connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: MODBUS_DEFAULT_BAUDRATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            timeout: MODBUS_DEFAULT_TIMEOUT,
        }
    }
}

/// Serde helper storing a `Duration` as whole milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Serde helper storing a `Duration` as whole microseconds.
pub(crate) mod duration_us {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

impl SerialConfig {
    fn data_bits(&self) -> io::Result<tokio_serial::DataBits> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported number of data bits: {other}"),
            )),
        }
    }

    fn stop_bits(&self) -> io::Result<tokio_serial::StopBits> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported number of stop bits: {other}"),
            )),
        }
    }

    fn parity(&self) -> tokio_serial::Parity {
        match self.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// A physical serial port.
pub struct SerialPortTransport {
    port_name: String,
    config: SerialConfig,
    port: Option<Box<dyn tokio_serial::SerialPort>>,
    last_activity: Option<Instant>,
}

impl SerialPortTransport {
    /// Creates a transport for `port_name` without opening it.
    pub fn new(port_name: &str, config: SerialConfig) -> Self {
        SerialPortTransport {
            port_name: port_name.to_string(),
            config,
            port: None,
            last_activity: None,
        }
    }

    /// Creates the transport and opens the port right away.
    pub fn connect(port_name: &str, config: SerialConfig) -> io::Result<Self> {
        let mut transport = Self::new(port_name, config);
        transport.open()?;
        Ok(transport)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn tokio_serial::SerialPort>> {
        let name = &self.port_name;
        self.port.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("serial port {name} is not open"),
            )
        })
    }
}

impl SerialTransport for SerialPortTransport {
    fn open(&mut self) -> io::Result<()> {
        if self.port.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("serial port {} is already open", self.port_name),
            ));
        }
        let port = tokio_serial::new(self.port_name.as_str(), self.config.baudrate)
            .data_bits(self.config.data_bits()?)
            .stop_bits(self.config.stop_bits()?)
            .parity(self.config.parity())
            .timeout(self.config.timeout)
            .open()
            .map_err(io::Error::from)?;
        debug!(
            "Opened serial port {} at {} baud",
            self.port_name, self.config.baudrate
        );
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the handle closes the port
        match self.port.take() {
            Some(_) => {
                debug!("Closed serial port {}", self.port_name);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("serial port {} is already closed", self.port_name),
            )),
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let timeout = self.config.timeout;
        let port = self.port_mut()?;
        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; max_bytes];
        let mut filled = 0;

        while filled < max_bytes {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn baudrate(&self) -> u32 {
        self.config.baudrate
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    fn mark_activity(&mut self, at: Instant) {
        self.last_activity = Some(at);
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.port_mut()?
            .clear(tokio_serial::ClearBuffer::All)
            .map_err(io::Error::from)
    }

    fn describe(&self) -> String {
        format!(
            "{} @ {} baud, {}{}{}, timeout {:?}",
            self.port_name,
            self.config.baudrate,
            self.config.data_bits,
            match self.config.parity {
                Parity::None => 'N',
                Parity::Even => 'E',
                Parity::Odd => 'O',
            },
            self.config.stop_bits,
            self.config.timeout
        )
    }
}

/// A transport shared by several instruments on the same line.
///
/// Every transport call locks the inner transport; callers still have to keep
/// whole transactions from interleaving.
pub struct SharedTransport<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedTransport<T> {
    fn clone(&self) -> Self {
        SharedTransport {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: SerialTransport> SharedTransport<T> {
    pub fn new(transport: T) -> Self {
        SharedTransport {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, T>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "shared serial transport lock poisoned"))
    }
}

impl<T: SerialTransport> SerialTransport for SharedTransport<T> {
    fn open(&mut self) -> io::Result<()> {
        self.lock()?.open()
    }

    fn close(&mut self) -> io::Result<()> {
        self.lock()?.close()
    }

    fn is_open(&self) -> bool {
        self.lock().map(|t| t.is_open()).unwrap_or(false)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock()?.write(data)
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        self.lock()?.read(max_bytes)
    }

    fn baudrate(&self) -> u32 {
        self.lock()
            .map(|t| t.baudrate())
            .unwrap_or(MODBUS_DEFAULT_BAUDRATE)
    }

    fn timeout(&self) -> Duration {
        self.lock()
            .map(|t| t.timeout())
            .unwrap_or(MODBUS_DEFAULT_TIMEOUT)
    }

    fn last_activity(&self) -> Option<Instant> {
        self.lock().ok().and_then(|t| t.last_activity())
    }

    fn mark_activity(&mut self, at: Instant) {
        if let Ok(mut transport) = self.lock() {
            transport.mark_activity(at);
        }
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.lock()?.clear_buffers()
    }

    fn describe(&self) -> String {
        self.lock()
            .map(|t| format!("shared {}", t.describe()))
            .unwrap_or_else(|_| "shared serial transport (poisoned)".to_string())
    }
}
