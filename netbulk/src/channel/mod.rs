//! Channel layer for prompt matching and PTY operations.
//!
//! This module handles the interactive session plumbing: accumulating
//! terminal output, stripping ANSI escapes, and waiting for prompts.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{PtyChannel, PtyConfig};
