//! High-level driver for vendor CLIs.
//!
//! The driver layer provides the command API on top of a PTY channel:
//! single commands for retrieval and configuration sets for push.

mod response;
mod session;

pub use response::Response;
pub use session::CliSession;

use std::time::Duration;

/// Per-command read timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(90);

/// Default multiplier for the delay between configuration lines.
pub const GLOBAL_DELAY_FACTOR: u32 = 4;
