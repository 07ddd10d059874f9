//! Structured logging for provisioning runs
//!
//! - `init(profile)` installs the global subscriber once
//! - `log_op_start!` / `log_op_end!` / `log_op_error!` emit lifecycle events
//! - `init_test_capture()` records events in memory for assertions
//!
//! ```rust
//! use dbfixture_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

use std::time::Instant;

/// Milliseconds since `started`, saturating
pub fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
