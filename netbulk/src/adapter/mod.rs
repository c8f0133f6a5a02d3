//! Protocol adapters: one push or retrieve operation per device session.
//!
//! The adapters are free functions over a [`DeviceBackend`], the seam
//! between run orchestration and the network. [`NetworkBackend`] is the
//! real implementation (CLI sessions, NETCONF sessions and the jump-host
//! tunnel); tests substitute their own.

mod format;
mod network;

pub use format::{format_output, pretty_json, pretty_xml, wrap_json, wrap_xml};
pub use network::NetworkBackend;

use std::future::Future;

use log::debug;

use crate::config::{JumpHost, OutputFormat};
use crate::error::Result;
use crate::transport::SshConfig;
use crate::tunnel::Forwarder;
use crate::vault::Credential;

/// Resolved connection parameters for one device session.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    /// Device identity from the inventory, used for artifact names and logs.
    pub identity: String,

    /// Platform name (e.g. "cisco_ios").
    pub platform: String,

    /// Address actually connected to (loopback when tunneled).
    pub address: String,

    /// Port actually connected to.
    pub port: u16,

    pub credential: Credential,
}

impl DeviceTarget {
    /// SSH settings for this target.
    pub fn ssh_config(&self) -> SshConfig {
        SshConfig::new(
            self.address.clone(),
            self.port,
            self.credential.username.clone(),
            self.credential.password.clone(),
        )
    }
}

/// Network capabilities the orchestrator drives.
///
/// Each device operation opens its own session and closes it before
/// returning.
pub trait DeviceBackend: Send + Sync {
    /// Tunnel produced by [`connect_jump`](Self::connect_jump).
    type Tunnel: Forwarder;

    /// Connect to the jump host.
    fn connect_jump(&self, jump: &JumpHost) -> impl Future<Output = Result<Self::Tunnel>> + Send;

    /// Apply configuration lines as one configuration-mode transaction and
    /// return the device output.
    fn send_config(
        &self,
        target: &DeviceTarget,
        lines: &[String],
    ) -> impl Future<Output = Result<String>> + Send;

    /// Run one command and return its output.
    fn send_command(
        &self,
        target: &DeviceTarget,
        command: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// `edit-config` on the running datastore; returns the raw reply.
    fn edit_config(
        &self,
        target: &DeviceTarget,
        config: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Push rendered configuration text over an SSH CLI session.
///
/// Blank lines are dropped before sending.
pub async fn push_ssh<B: DeviceBackend>(
    backend: &B,
    target: &DeviceTarget,
    config_text: &str,
) -> Result<String> {
    let lines: Vec<String> = config_text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    debug!("{}: pushing {} configuration lines", target.identity, lines.len());
    backend.send_config(target, &lines).await
}

/// Run `command` over an SSH CLI session and re-encode the output.
pub async fn retrieve_ssh<B: DeviceBackend>(
    backend: &B,
    target: &DeviceTarget,
    command: &str,
    format: OutputFormat,
) -> Result<String> {
    let raw = backend.send_command(target, command).await?;
    Ok(format_output(&raw, format))
}

/// Push an XML configuration payload with NETCONF `edit-config`.
pub async fn push_netconf<B: DeviceBackend>(
    backend: &B,
    target: &DeviceTarget,
    xml: &str,
) -> Result<String> {
    backend.edit_config(target, xml).await
}
