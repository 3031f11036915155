//! # Rate-Limited Logging Utilities
//!
//! A busy 433 MHz band produces a steady trickle of frames that fail CRC
//! (co-channel traffic, partial receptions, plain noise). Each one is worth
//! a log line; a few hundred a minute are not. The throttle here caps how
//! many messages a given call site emits per time window, and the
//! `log_*_throttled!` macros wrap the standard levels with that check.
//!
//! ## Usage
//!
//! ```rust
//! use openthings_rs::util::logging::LogThrottle;
//! use openthings_rs::log_warn_throttled;
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! log_warn_throttled!(throttle, "CRC mismatch on received frame");
//! ```

use std::time::Instant;

/// Throttling structure for rate-limiting log messages.
///
/// Counts messages within a fixed time window; once the cap is hit,
/// further messages are suppressed until the window rolls over.
#[derive(Debug)]
pub struct LogThrottle {
    /// Window length in ms
    window_ms: u64,
    /// Messages allowed per window
    cap: u32,
    /// Messages seen in the current window
    count: u32,
    /// When the current window opened
    t0: Instant,
}

impl LogThrottle {
    /// Create a new throttle allowing `cap` messages per `window_ms`.
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            t0: Instant::now(),
        }
    }

    /// Check whether logging is allowed; resets the counter after the
    /// window expires.
    pub fn allow(&mut self) -> bool {
        if self.t0.elapsed().as_millis() as u64 > self.window_ms {
            self.t0 = Instant::now();
            self.count = 0;
        }
        self.count += 1;
        self.count <= self.cap
    }

    /// Start a new window immediately.
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Log frame bytes in compact hex at debug level.
///
/// OpenThings frames top out at 67 bytes, so the whole frame is always
/// dumped.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    log::debug!(
        "{prefix}: {} ({} bytes)",
        crate::util::hex::format_hex_compact(data),
        data.len()
    );
}

/// Log an error with throttling
#[macro_export]
macro_rules! log_error_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::error!($($arg)*);
        }
    };
}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}

/// Log an info message with throttling
#[macro_export]
macro_rules! log_info_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::info!($($arg)*);
        }
    };
}
