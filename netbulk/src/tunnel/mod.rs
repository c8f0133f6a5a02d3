//! Jump-host tunnel multiplexer.
//!
//! One authenticated SSH session to a jump host carries any number of
//! forwarded endpoints. Each [`TunnelMultiplexer::forward`] call binds a
//! loopback listener on an OS-assigned port and hands it to a relay task
//! that accepts a single connection and pipes it through a `direct-tcpip`
//! channel to the remote endpoint.
//!
//! Relay tasks live in a supervised pool: closing the multiplexer cancels
//! them, waits a bounded grace period, and aborts whatever is left.
//!
//! # Example
//!
//! ```rust,no_run
//! use netbulk::transport::SshConfig;
//! use netbulk::tunnel::TunnelMultiplexer;
//!
//! # async fn example() -> Result<(), netbulk::Error> {
//! let jump = SshConfig::new("bastion.example.net", 22, "ops", "secret".into());
//! let mut tunnel = TunnelMultiplexer::connect(jump).await?;
//!
//! let local_port = tunnel.forward("10.0.0.1", 22).await?;
//! // connect an SSH client to 127.0.0.1:local_port
//!
//! tunnel.close().await;
//! # Ok(())
//! # }
//! ```

mod relay;

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TunnelError};
use crate::transport::{SshConfig, SshStream, SshTransport};

/// Default idle timeout for a forwarded connection.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// How long `close` waits for relays to wind down before aborting them.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Something that can open a byte stream to a remote endpoint.
///
/// The SSH implementation opens `direct-tcpip` channels on the jump
/// session. Implementations must tolerate concurrent `open` calls.
pub trait ChannelOpener: Send + Sync + 'static {
    /// Stream type produced for each forwarded connection.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a stream to `host:port` on behalf of the local peer `originator`.
    fn open(
        &self,
        host: &str,
        port: u16,
        originator: SocketAddr,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Tear down the underlying connection.
    fn shutdown(&self) -> impl Future<Output = Result<()>> + Send;
}

impl ChannelOpener for SshTransport {
    type Stream = SshStream;

    async fn open(&self, host: &str, port: u16, originator: SocketAddr) -> Result<SshStream> {
        self.open_direct_tcpip(host, port, &originator.ip().to_string(), originator.port())
            .await
            .map_err(|e| {
                TunnelError::ChannelRefused {
                    host: host.to_string(),
                    port,
                    message: e.to_string(),
                }
                .into()
            })
    }

    async fn shutdown(&self) -> Result<()> {
        self.disconnect().await
    }
}

/// Local port forwarding as seen by the orchestrator.
pub trait Forwarder: Send {
    /// Expose `host:port` on a loopback port and return that port.
    fn forward(&mut self, host: &str, port: u16) -> impl Future<Output = Result<u16>> + Send;

    /// Release every forward and the underlying connection. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Multiplexes forwarded endpoints over one jump-host connection.
pub struct TunnelMultiplexer<O: ChannelOpener = SshTransport> {
    opener: Arc<O>,
    relays: JoinSet<()>,
    cancel: CancellationToken,
    idle_timeout: Duration,
    closed: bool,
}

impl TunnelMultiplexer<SshTransport> {
    /// Connect and authenticate to the jump host.
    ///
    /// The connection attempt is bounded by `config.timeout`; failures come
    /// back as distinct transport errors (authentication, timeout,
    /// unreachable host).
    pub async fn connect(config: SshConfig) -> Result<Self> {
        info!("Connecting to jump host {}", config.socket_addr());
        let transport = SshTransport::connect(config).await?;
        Ok(Self::new(transport))
    }
}

impl<O: ChannelOpener> TunnelMultiplexer<O> {
    /// Build a multiplexer over an already-connected opener.
    pub fn new(opener: O) -> Self {
        Self {
            opener: Arc::new(opener),
            relays: JoinSet::new(),
            cancel: CancellationToken::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            closed: false,
        }
    }

    /// Set the idle timeout for forwarded connections.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Check whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of relays that have not finished yet.
    pub fn active_relays(&self) -> usize {
        self.relays.len()
    }

    /// Bind a loopback listener for `host:port` and return its port.
    ///
    /// Returns as soon as the listener is bound. Channel-open failures
    /// happen later, inside the relay, and surface to the client as a
    /// closed connection.
    pub async fn forward(&mut self, host: &str, port: u16) -> Result<u16> {
        if self.closed {
            return Err(TunnelError::Closed.into());
        }

        // Reap finished relays so the pool does not grow across a long run.
        while self.relays.try_join_next().is_some() {}

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(TunnelError::Bind)?;
        let local_port = listener.local_addr().map_err(TunnelError::Bind)?.port();

        info!("Forwarding 127.0.0.1:{local_port} -> {host}:{port}");

        self.relays.spawn(relay::run(
            listener,
            Arc::clone(&self.opener),
            host.to_string(),
            port,
            self.cancel.child_token(),
            self.idle_timeout,
        ));

        Ok(local_port)
    }

    /// Cancel every relay, wait for them briefly, and disconnect.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();

        let relays = &mut self.relays;
        let joined = tokio::time::timeout(CLOSE_GRACE, async {
            while relays.join_next().await.is_some() {}
        })
        .await;

        if joined.is_err() {
            warn!(
                "{} relay(s) still running after {CLOSE_GRACE:?}, aborting",
                self.relays.len()
            );
            self.relays.abort_all();
        }

        if let Err(e) = self.opener.shutdown().await {
            debug!("Jump session shutdown: {e}");
        }
        info!("Tunnel closed");
    }
}

impl<O: ChannelOpener> Forwarder for TunnelMultiplexer<O> {
    fn forward(&mut self, host: &str, port: u16) -> impl Future<Output = Result<u16>> + Send {
        TunnelMultiplexer::forward(self, host, port)
    }

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        TunnelMultiplexer::close(self)
    }
}

impl<O: ChannelOpener> Drop for TunnelMultiplexer<O> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
