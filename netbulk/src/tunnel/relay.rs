//! One forwarded connection: accept, open the remote channel, pump bytes.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::ChannelOpener;

const RELAY_BUFFER: usize = 16 * 1024;

/// Relay task body for a single loopback listener.
///
/// Accepts exactly one connection, drops the listener, then relays
/// between the accepted socket and a channel opened to `host:port`.
pub(super) async fn run<O: ChannelOpener>(
    listener: TcpListener,
    opener: Arc<O>,
    host: String,
    port: u16,
    cancel: CancellationToken,
    idle_timeout: Duration,
) {
    let accepted = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Relay for {host}:{port} cancelled before accept");
            return;
        }
        accepted = listener.accept() => accepted,
    };
    drop(listener);

    let (socket, peer) = match accepted {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!("Relay for {host}:{port} failed to accept: {e}");
            return;
        }
    };
    debug!("Relay accepted {peer} for {host}:{port}");

    let remote = tokio::select! {
        _ = cancel.cancelled() => return,
        remote = opener.open(&host, port, peer) => remote,
    };

    let remote = match remote {
        Ok(remote) => remote,
        Err(e) => {
            // Dropping the socket closes the client side.
            warn!("Could not open channel to {host}:{port}: {e}");
            return;
        }
    };

    match pump(socket, remote, &cancel, idle_timeout).await {
        Ok((up, down)) => debug!("Relay {host}:{port} finished ({up} bytes up, {down} bytes down)"),
        Err(e) => debug!("Relay {host}:{port} ended with error: {e}"),
    }
}

/// Copy bytes both ways until one side closes, the link goes idle, or the
/// relay is cancelled. Returns the byte counts (local to remote, remote to
/// local).
pub(super) async fn pump<L, R>(
    local: L,
    remote: R,
    cancel: &CancellationToken,
    idle_timeout: Duration,
) -> io::Result<(u64, u64)>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    let (mut local_read, mut local_write) = tokio::io::split(local);
    let (mut remote_read, mut remote_write) = tokio::io::split(remote);

    let mut up_buf = vec![0u8; RELAY_BUFFER];
    let mut down_buf = vec![0u8; RELAY_BUFFER];
    let (mut up, mut down) = (0u64, 0u64);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(idle_timeout) => {
                debug!("Relay idle for {idle_timeout:?}, closing");
                break;
            }
            read = local_read.read(&mut up_buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                remote_write.write_all(&up_buf[..n]).await?;
                remote_write.flush().await?;
                up += n as u64;
            }
            read = remote_read.read(&mut down_buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                local_write.write_all(&down_buf[..n]).await?;
                local_write.flush().await?;
                down += n as u64;
            }
        }
    }

    let _ = remote_write.shutdown().await;
    let _ = local_write.shutdown().await;
    Ok((up, down))
}
