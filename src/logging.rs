//! Process-wide logging setup.
//!
//! Everything logs through the `log` facade; binaries install `env_logger`
//! once at startup via [`init_logger`]. The default filter is `info` so
//! operational lines (transmits, cache promotions, scan results) show up
//! without `RUST_LOG` being set; use `RUST_LOG=openthings_rs=debug` to watch
//! the receive path frame by frame.

use env_logger::Env;

/// Install the process-wide logger.
///
/// Later calls are ignored rather than panicking, so test binaries can call
/// this from every test that wants log output.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Log a pre-formatted operational message at info level.
pub fn log_info(message: &str) {
    log::info!("{message}");
}

/// Log a pre-formatted warning.
pub fn log_warn(message: &str) {
    log::warn!("{message}");
}

/// Log a pre-formatted error.
pub fn log_error(message: &str) {
    log::error!("{message}");
}

/// Log a pre-formatted debug message.
pub fn log_debug(message: &str) {
    log::debug!("{message}");
}
