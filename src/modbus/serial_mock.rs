//! Mock serial port implementation for testing
//!
//! [`MockSerialPort`] answers written frames from a table of canned responses
//! keyed by the exact request bytes, or from a FIFO queue when no key matches.
//! It can simulate a half-duplex line that echoes what was sent, fragmented
//! reads and injected I/O errors, and it records every written frame.

use super::serial::SerialTransport;
use crate::constants::{MODBUS_DEFAULT_BAUDRATE, MODBUS_DEFAULT_TIMEOUT};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct MockState {
    is_open: bool,
    baudrate: u32,
    timeout: Duration,
    last_activity: Option<Instant>,
    /// Responses keyed by request frame
    responses: HashMap<Vec<u8>, Vec<u8>>,
    /// Responses used when no keyed response matches
    queued: VecDeque<Vec<u8>>,
    /// Bytes waiting to be read
    rx_buffer: VecDeque<u8>,
    /// Every frame written, in order
    tx_frames: Vec<Vec<u8>>,
    local_echo: bool,
    corrupt_echo: bool,
    max_read_chunk: Option<usize>,
    next_write_error: Option<io::Error>,
    next_read_error: Option<io::Error>,
    short_write: Option<usize>,
    open_count: usize,
    close_count: usize,
    clear_count: usize,
    read_count: usize,
}

/// Mock serial port that simulates a Modbus slave.
///
/// Clones share state, so a test can keep a handle while the instrument owns another.
#[derive(Debug, Clone)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerialPort {
    /// Creates an open mock port at the default baud rate.
    pub fn new() -> Self {
        MockSerialPort {
            state: Arc::new(Mutex::new(MockState {
                is_open: true,
                baudrate: MODBUS_DEFAULT_BAUDRATE,
                timeout: MODBUS_DEFAULT_TIMEOUT,
                last_activity: None,
                responses: HashMap::new(),
                queued: VecDeque::new(),
                rx_buffer: VecDeque::new(),
                tx_frames: Vec::new(),
                local_echo: false,
                corrupt_echo: false,
                max_read_chunk: None,
                next_write_error: None,
                next_read_error: None,
                short_write: None,
                open_count: 0,
                close_count: 0,
                clear_count: 0,
                read_count: 0,
            })),
        }
    }

    /// Creates a closed mock port.
    pub fn closed() -> Self {
        let port = Self::new();
        port.state().is_open = false;
        port
    }

    pub fn with_baudrate(self, baudrate: u32) -> Self {
        self.state().baudrate = baudrate;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.state().timeout = timeout;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers `request` with `response` every time it is written.
    pub fn add_response(&self, request: &[u8], response: &[u8]) {
        self.state()
            .responses
            .insert(request.to_vec(), response.to_vec());
    }

    /// Queues a response for the next written frame without a keyed response.
    pub fn queue_response(&self, response: &[u8]) {
        self.state().queued.push_back(response.to_vec());
    }

    /// Puts bytes straight into the receive buffer.
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.state().rx_buffer.extend(data);
    }

    /// Echoes every written frame back before the response.
    pub fn set_local_echo(&self, enabled: bool) {
        self.state().local_echo = enabled;
    }

    /// Flips the first bit of every echoed frame.
    pub fn set_corrupt_echo(&self, enabled: bool) {
        self.state().corrupt_echo = enabled;
    }

    /// Limits how many bytes a single read returns.
    pub fn set_max_read_chunk(&self, chunk: Option<usize>) {
        self.state().max_read_chunk = chunk;
    }

    /// Makes the next write fail with `error`.
    pub fn set_next_write_error(&self, error: io::Error) {
        self.state().next_write_error = Some(error);
    }

    /// Makes the next read fail with `error`.
    pub fn set_next_read_error(&self, error: io::Error) {
        self.state().next_read_error = Some(error);
    }

    /// Makes the next write report only `count` bytes written.
    pub fn set_short_write(&self, count: usize) {
        self.state().short_write = Some(count);
    }

    /// Frames written so far.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.state().tx_frames.clone()
    }

    pub fn last_written(&self) -> Option<Vec<u8>> {
        self.state().tx_frames.last().cloned()
    }

    /// Bytes still waiting in the receive buffer.
    pub fn pending_rx(&self) -> usize {
        self.state().rx_buffer.len()
    }

    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    pub fn close_count(&self) -> usize {
        self.state().close_count
    }

    pub fn clear_count(&self) -> usize {
        self.state().clear_count
    }

    pub fn read_count(&self) -> usize {
        self.state().read_count
    }

    /// Forgets written frames and pending input; responses stay registered.
    pub fn reset(&self) {
        let mut state = self.state();
        state.tx_frames.clear();
        state.rx_buffer.clear();
        state.queued.clear();
    }
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "mock serial port is not open")
}

impl SerialTransport for MockSerialPort {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.state();
        if state.is_open {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "mock serial port is already open",
            ));
        }
        state.is_open = true;
        state.open_count += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let mut state = self.state();
        if !state.is_open {
            return Err(not_open());
        }
        state.is_open = false;
        state.close_count += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state().is_open
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if !state.is_open {
            return Err(not_open());
        }
        if let Some(error) = state.next_write_error.take() {
            return Err(error);
        }
        state.tx_frames.push(data.to_vec());

        if state.local_echo {
            let mut echo = data.to_vec();
            if state.corrupt_echo {
                if let Some(first) = echo.first_mut() {
                    *first ^= 0x01;
                }
            }
            state.rx_buffer.extend(echo);
        }

        let keyed = state.responses.get(data).cloned();
        if let Some(response) = keyed.or_else(|| state.queued.pop_front()) {
            state.rx_buffer.extend(response);
        }

        Ok(state.short_write.take().unwrap_or(data.len()))
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut state = self.state();
        if !state.is_open {
            return Err(not_open());
        }
        state.read_count += 1;
        if let Some(error) = state.next_read_error.take() {
            return Err(error);
        }
        let limit = state
            .max_read_chunk
            .map_or(max_bytes, |chunk| chunk.min(max_bytes));
        let count = limit.min(state.rx_buffer.len());
        Ok(state.rx_buffer.drain(..count).collect())
    }

    fn baudrate(&self) -> u32 {
        self.state().baudrate
    }

    fn timeout(&self) -> Duration {
        self.state().timeout
    }

    fn last_activity(&self) -> Option<Instant> {
        self.state().last_activity
    }

    fn mark_activity(&mut self, at: Instant) {
        self.state().last_activity = Some(at);
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.rx_buffer.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("mock serial port @ {} baud", self.baudrate())
    }
}
