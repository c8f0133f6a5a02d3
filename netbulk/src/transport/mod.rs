//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management,
//! handling connection setup, password authentication, and the three
//! channel kinds netbulk needs: PTY shells for vendor CLIs, the `netconf`
//! subsystem, and `direct-tcpip` channels for jump-host forwarding.

pub mod config;
mod ssh;

pub use config::SshConfig;
pub use ssh::{SshStream, SshTransport};
