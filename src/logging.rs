//! Logger setup for binaries and tests.
//!
//! The library only emits records through the `log` facade; these helpers
//! install `env_logger` as the backend. `RUST_LOG` still overrides the level.

use log::LevelFilter;

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Initializes `env_logger` with `level` as the default filter.
///
/// Returns `false` if a logger was already installed.
pub fn init_logger_with_level(level: LevelFilter) -> bool {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    log::info!("{message}");
}

/// Logs an error message.
pub fn log_error(message: &str) {
    log::error!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_logger_with_level(LevelFilter::Debug);
        assert!(!init_logger_with_level(LevelFilter::Trace));
        log_info("logger installed");
        log_error("still works after a rejected init");
    }
}
