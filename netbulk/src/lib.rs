//! # netbulk
//!
//! Bulk configuration push and data retrieval for multi-vendor network
//! devices over SSH CLI and NETCONF.
//!
//! A run walks a CSV inventory one device at a time, optionally through a
//! single SSH jump host whose connection is shared by every device session,
//! and either pushes a per-row rendered template or retrieves one command's
//! output as a JSON, XML or text artifact. Retrieved artifacts can then be
//! aggregated into one CSV report.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with vendor prompt handling
//!   (Cisco IOS/XR/NX-OS, Juniper Junos, Nokia SR OS, Huawei VRP, Arista EOS)
//! - Jump-host tunnel multiplexer: any number of loopback forwards over one
//!   SSH connection, torn down as a unit
//! - NETCONF `edit-config` with 1.0 and 1.1 framing
//! - AES-256-GCM credential vault with named sections
//! - Report engine over JSON, XML and regex-scraped text
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netbulk::{CredentialVault, Orchestrator, RunFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netbulk::Error> {
//!     let vault = CredentialVault::initialize("secret.key", "creds.dat")?;
//!     let params = RunFile::load("run.toml")?.into_parameters(
//!         vault.load(netbulk::vault::MAIN_SECTION),
//!         vault.load(netbulk::vault::JUMP_SECTION),
//!     )?;
//!
//!     let report = Orchestrator::new(params).run().await;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod netconf;
pub mod orchestrator;
pub mod platform;
pub mod report;
pub mod template;
pub mod transport;
pub mod tunnel;
pub mod vault;

// Re-export main types for convenience
pub use adapter::{DeviceBackend, DeviceTarget, NetworkBackend};
pub use config::{JumpHost, Mode, OutputFormat, Protocol, RunFile, RunParameters};
pub use driver::{CliSession, Response};
pub use error::{Error, Result};
pub use netconf::NetconfSession;
pub use orchestrator::{BatchReport, Orchestrator, RowOutcome, RunState};
pub use platform::PlatformDefinition;
pub use report::{ReportRequest, ReportSummary, build_report};
pub use transport::SshConfig;
pub use tunnel::TunnelMultiplexer;
pub use vault::{Credential, CredentialVault};
