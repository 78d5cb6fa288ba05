//! # Frame Logging Utilities
//!
//! Hex dump helpers for protocol debugging. The transaction engine routes every
//! request and response through [`log_frame_hex`]; instruments with the debug
//! flag set log at info level, all others at trace level.
//!
//! ```rust
//! use modbus_rs::util::logging::{describe_bytes, log_frame_hex};
//!
//! log_frame_hex(log::Level::Debug, "Writing request", &[0x01, 0x03]);
//! assert_eq!(describe_bytes(b":01\r\n"), "3a 30 31 0d 0a (\":01\\r\\n\")");
//! ```

use crate::util::hex::format_hex_compact;
use log::Level;

/// Limit hex output to prevent log spam
const MAX_LOG_BYTES: usize = 64;

/// Log frame data in hex format.
///
/// Frames longer than 64 bytes are cut short and the total length is appended.
pub fn log_frame_hex(level: Level, prefix: &str, data: &[u8]) {
    if !log::log_enabled!(target: "modbus::frame", level) {
        return;
    }

    let display_data = &data[..data.len().min(MAX_LOG_BYTES)];
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::log!(
        target: "modbus::frame",
        level,
        "{prefix}: {}{suffix}",
        describe_bytes(display_data)
    );
}

/// Describe bytes as hex followed by their escaped text form.
///
/// The text form makes ASCII mode frames readable in logs.
pub fn describe_bytes(data: &[u8]) -> String {
    format!(
        "{} (\"{}\")",
        format_hex_compact(data),
        data.escape_ascii()
    )
}
