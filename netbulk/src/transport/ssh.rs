//! SSH transport implementation using russh.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelStream};
use tokio::sync::Mutex;

use super::config::SshConfig;
use crate::error::{Result, TransportError};

/// Interval between keepalive requests on an otherwise quiet session.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Byte stream over an SSH channel (`AsyncRead + AsyncWrite`).
pub type SshStream = ChannelStream<Msg>;

/// SSH transport wrapping russh client.
///
/// The session handle sits behind a mutex so a single transport can be
/// shared by concurrent tasks that each open their own channels.
pub struct SshTransport {
    /// The russh session handle.
    session: Mutex<Handle<SshHandler>>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    ///
    /// `config.timeout` bounds the handshake and authentication together.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client_config());

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
        };

        debug!("Connecting to {}", config.socket_addr());

        let deadline = tokio::time::Instant::now() + config.timeout;
        let timed_out = || TransportError::Timeout {
            host: config.host.clone(),
            port: config.port,
            timeout: config.timeout,
        };

        let mut session = tokio::time::timeout_at(
            deadline,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| match e {
            russh::Error::IO(source) => TransportError::Unreachable {
                host: config.host.clone(),
                port: config.port,
                source,
            },
            other => session_error(other),
        })?;

        tokio::time::timeout_at(deadline, Self::authenticate(&mut session, &config))
            .await
            .map_err(|_| timed_out())??;

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Get the configuration used for this connection.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Open a PTY shell channel and return it as a byte stream.
    pub async fn open_shell(&self) -> Result<SshStream> {
        let channel = self.open_session_channel().await?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(session_error)?;

        channel
            .request_shell(true)
            .await
            .map_err(session_error)?;

        Ok(channel.into_stream())
    }

    /// Open a channel bound to an SSH subsystem (e.g. `netconf`).
    pub async fn open_subsystem(&self, name: &str) -> Result<SshStream> {
        let channel = self.open_session_channel().await?;

        channel
            .request_subsystem(true, name)
            .await
            .map_err(session_error)?;

        Ok(channel.into_stream())
    }

    /// Open a `direct-tcpip` channel to `host:port` through this connection.
    pub async fn open_direct_tcpip(
        &self,
        host: &str,
        port: u16,
        originator_address: &str,
        originator_port: u16,
    ) -> Result<SshStream> {
        let channel = self
            .session
            .lock()
            .await
            .channel_open_direct_tcpip(
                host,
                u32::from(port),
                originator_address,
                u32::from(originator_port),
            )
            .await
            .map_err(session_error)?;

        Ok(channel.into_stream())
    }

    /// Disconnect the session.
    pub async fn disconnect(&self) -> Result<()> {
        self.session
            .lock()
            .await
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(session_error)?;
        Ok(())
    }

    async fn open_session_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .lock()
            .await
            .channel_open_session()
            .await
            .map_err(session_error)?;
        Ok(channel)
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        use secrecy::ExposeSecret;

        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(session_error)?
            .success();

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Client settings shared by jump and device sessions.
///
/// `SshConfig::timeout` bounds connect and authentication only. An
/// established session stays up until it is disconnected or the peer stops
/// answering keepalives; quiet periods (slow commands, a slow `direct-tcpip`
/// open on the jump host) must not end it.
fn client_config() -> client::Config {
    client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: 3,
        ..Default::default()
    }
}

/// Classify a russh error, separating a dead session from protocol errors.
fn session_error(e: russh::Error) -> TransportError {
    match e {
        russh::Error::Disconnect
        | russh::Error::SendError
        | russh::Error::KeepaliveTimeout
        | russh::Error::InactivityTimeout => TransportError::Disconnected,
        other => TransportError::Ssh(other),
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!(
            "Accepting {} host key from {}:{} without verification",
            server_public_key.algorithm(),
            self.host,
            self.port
        );
        Ok(true)
    }
}
