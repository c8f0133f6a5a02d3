//! Device backend over real SSH and NETCONF sessions.

use log::debug;

use super::{DeviceBackend, DeviceTarget};
use crate::config::JumpHost;
use crate::driver::CliSession;
use crate::error::Result;
use crate::netconf::NetconfSession;
use crate::platform::PlatformRegistry;
use crate::tunnel::TunnelMultiplexer;

/// Backend that talks to real devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkBackend;

impl NetworkBackend {
    pub fn new() -> Self {
        Self
    }

    async fn cli_session(&self, target: &DeviceTarget) -> Result<CliSession> {
        let platform = PlatformRegistry::lookup(&target.platform)?;
        debug!(
            "{}: opening {} session via {}:{}",
            target.identity, target.platform, target.address, target.port
        );
        CliSession::connect(target.ssh_config(), platform).await
    }
}

impl DeviceBackend for NetworkBackend {
    type Tunnel = TunnelMultiplexer;

    async fn connect_jump(&self, jump: &JumpHost) -> Result<TunnelMultiplexer> {
        TunnelMultiplexer::connect(jump.ssh_config()).await
    }

    async fn send_config(&self, target: &DeviceTarget, lines: &[String]) -> Result<String> {
        let mut session = self.cli_session(target).await?;
        let result = session.send_config_set(lines).await;

        if let Err(e) = session.close().await {
            debug!("{}: close failed: {e}", target.identity);
        }

        let responses = result?;
        Ok(responses
            .iter()
            .map(|response| response.raw_result.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn send_command(&self, target: &DeviceTarget, command: &str) -> Result<String> {
        let mut session = self.cli_session(target).await?;
        let result = session.send_command(command).await;

        if let Err(e) = session.close().await {
            debug!("{}: close failed: {e}", target.identity);
        }

        Ok(result?.result)
    }

    async fn edit_config(&self, target: &DeviceTarget, config: &str) -> Result<String> {
        debug!(
            "{}: opening NETCONF session via {}:{}",
            target.identity, target.address, target.port
        );
        let mut session = NetconfSession::connect(target.ssh_config()).await?;
        let result = session.edit_config(config).await;

        if let Err(e) = session.close().await {
            debug!("{}: close failed: {e}", target.identity);
        }

        Ok(result?.raw)
    }
}
