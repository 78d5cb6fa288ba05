//! # Modbus Transaction Engine
//!
//! One transaction is: make sure the port is open, optionally flush it, respect
//! the inter-frame silence, write the request, consume a local echo, read the
//! response and record how long the round trip took. The engine knows nothing
//! about frame contents; validating the response is left to the caller.

use super::serial::{duration_us, minimum_silent_period, SerialTransport};
use crate::constants::{MODBUS_MAX_READ_BUFFER, MODBUS_SILENT_PERIOD_FLOOR};
use crate::error::ModbusError;
use crate::util::hex::format_hex_compact;
use crate::util::logging::log_frame_hex;
use log::{debug, warn, Level};
use serde::{Deserialize, Serialize};
use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Behaviour switches of a session with one slave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Open the port before and close it after every transaction.
    pub close_port_after_each_call: bool,
    pub clear_buffers_before_each_transaction: bool,
    /// The line echoes every transmitted byte (some RS-485 adapters).
    pub handle_local_echo: bool,
    /// Read exactly the predicted response length instead of waiting for the timeout.
    pub precalculate_read_size: bool,
    /// Log frames at info level instead of trace level.
    pub debug: bool,
    #[serde(with = "duration_us", rename = "silent_period_floor_us")]
    pub silent_period_floor: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            close_port_after_each_call: false,
            clear_buffers_before_each_transaction: false,
            handle_local_echo: false,
            precalculate_read_size: true,
            debug: false,
            silent_period_floor: MODBUS_SILENT_PERIOD_FLOOR,
        }
    }
}

/// Where the engine is in the current (or last) transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    PortOpen,
    Sent,
    AwaitingResponse,
    /// A non-empty response was received
    Validated,
    Failed,
    PortClosed,
}

/// Runs request/response exchanges over a transport.
#[derive(Debug)]
pub struct TransactionEngine<T: SerialTransport> {
    transport: T,
    session: SessionConfig,
    state: TransactionState,
    last_roundtrip_time: Option<Duration>,
}

impl<T: SerialTransport> TransactionEngine<T> {
    pub fn new(transport: T, session: SessionConfig) -> Self {
        TransactionEngine {
            transport,
            session,
            state: TransactionState::Idle,
            last_roundtrip_time: None,
        }
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionConfig {
        &mut self.session
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Time from the start of the last write to the end of its read.
    pub fn last_roundtrip_time(&self) -> Option<Duration> {
        self.last_roundtrip_time
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Minimum silence between frames at the transport's baud rate.
    pub fn silent_period(&self) -> Duration {
        minimum_silent_period(self.transport.baudrate(), self.session.silent_period_floor)
    }

    /// Sends `request` and returns the raw response.
    ///
    /// `expected_len` is the predicted response length, if known. Broadcast
    /// requests return an empty response without reading.
    pub fn communicate(
        &mut self,
        request: &[u8],
        expected_len: Option<usize>,
        broadcast: bool,
    ) -> Result<Vec<u8>, ModbusError> {
        if request.is_empty() {
            return Err(ModbusError::InvalidArgument(
                "request frame must not be empty".to_string(),
            ));
        }

        let result = self
            .ensure_open()
            .and_then(|()| self.exchange(request, expected_len, broadcast));

        self.state = match result {
            Ok(_) => TransactionState::Validated,
            Err(_) => TransactionState::Failed,
        };

        if self.session.close_port_after_each_call && self.transport.is_open() {
            match self.transport.close() {
                Ok(()) => {
                    debug!("Closed port after transaction");
                    self.state = TransactionState::PortClosed;
                }
                Err(e) if result.is_ok() => return Err(e.into()),
                Err(e) => warn!("Failed to close port after failed transaction: {e}"),
            }
        }

        result
    }

    fn ensure_open(&mut self) -> Result<(), ModbusError> {
        if self.transport.is_open() {
            return Ok(());
        }
        if !self.session.close_port_after_each_call {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{} is not open", self.transport.describe()),
            )
            .into());
        }
        self.transport.open()?;
        self.state = TransactionState::PortOpen;
        debug!("Opened port for transaction");
        Ok(())
    }

    fn exchange(
        &mut self,
        request: &[u8],
        expected_len: Option<usize>,
        broadcast: bool,
    ) -> Result<Vec<u8>, ModbusError> {
        if self.session.clear_buffers_before_each_transaction {
            self.transport.clear_buffers()?;
        }

        self.wait_for_silent_period();

        let start = Instant::now();
        let result = self.transfer(request, expected_len, broadcast);
        let end = Instant::now();
        self.last_roundtrip_time = Some(end - start);
        self.transport.mark_activity(end);
        debug!("Round trip took {:?}", end - start);

        // No reply follows a broadcast, so its silent period is spent here
        if broadcast && result.is_ok() {
            self.wait_for_silent_period();
        }
        result
    }

    fn wait_for_silent_period(&self) {
        let Some(last) = self.transport.last_activity() else {
            return;
        };
        let remaining = self.silent_period().saturating_sub(last.elapsed());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }

    fn transfer(
        &mut self,
        request: &[u8],
        expected_len: Option<usize>,
        broadcast: bool,
    ) -> Result<Vec<u8>, ModbusError> {
        self.log_frame("Writing request", request);
        let written = self.transport.write(request)?;
        if written != request.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("wrote {written} of {} request byte(s)", request.len()),
            )
            .into());
        }
        self.state = TransactionState::Sent;

        if self.session.handle_local_echo {
            let echo = self.read_exact_or_less(request.len())?;
            self.log_frame("Local echo", &echo);
            if echo != request {
                return Err(ModbusError::LocalEcho {
                    sent: request.to_vec(),
                    received: echo,
                });
            }
        }

        if broadcast {
            debug!("Broadcast request, not waiting for a response");
            return Ok(Vec::new());
        }

        self.state = TransactionState::AwaitingResponse;
        let response = match expected_len {
            Some(len) if self.session.precalculate_read_size => self.read_exact_or_less(len)?,
            _ => self.transport.read(MODBUS_MAX_READ_BUFFER)?,
        };
        self.log_frame("Received response", &response);

        if response.is_empty() {
            return Err(ModbusError::NoResponse(format!(
                "no bytes received within {:?} for request [{}]",
                self.transport.timeout(),
                format_hex_compact(request)
            )));
        }
        Ok(response)
    }

    /// Reads until `len` bytes arrived or a read returns nothing.
    fn read_exact_or_less(&mut self, len: usize) -> Result<Vec<u8>, ModbusError> {
        let mut buf = Vec::with_capacity(len);
        while buf.len() < len {
            let chunk = self.transport.read(len - buf.len())?;
            if chunk.is_empty() {
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    fn log_frame(&self, prefix: &str, data: &[u8]) {
        let level = if self.session.debug {
            Level::Info
        } else {
            Level::Trace
        };
        log_frame_hex(level, prefix, data);
    }
}
