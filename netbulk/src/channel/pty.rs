//! PTY channel for interactive CLI sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Default timeout for pattern reads.
    pub timeout: Duration,

    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Line terminator appended to every sent command.
    pub return_char: &'static str,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            return_char: "\n",
        }
    }
}

/// PTY channel over any async byte stream.
///
/// Writes commands and reads output until a prompt pattern shows up in the
/// tail of the cleaned buffer.
pub struct PtyChannel<S> {
    stream: S,
    config: PtyConfig,
    buffer: PatternBuffer,
}

impl<S> PtyChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a new PTY channel over the given stream.
    pub fn new(stream: S, config: PtyConfig) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth),
            stream,
            config,
        }
    }

    /// Send a command followed by the return character.
    pub async fn send(&mut self, command: &str) -> Result<()> {
        trace!("send: {command:?}");
        self.stream
            .write_all(command.as_bytes())
            .await
            .map_err(ChannelError::Io)?;
        self.stream
            .write_all(self.config.return_char.as_bytes())
            .await
            .map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;
        Ok(())
    }

    /// Read until `pattern` matches the buffer tail, returning everything
    /// accumulated since the previous read.
    pub async fn read_until_pattern(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut chunk = [0u8; 8192];

        while !self.buffer.tail_contains(pattern) {
            let read = tokio::time::timeout_at(deadline, self.stream.read(&mut chunk))
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?
                .map_err(ChannelError::Io)?;

            if read == 0 {
                return Err(ChannelError::Closed.into());
            }
            trace!("recv {read} bytes");
            self.buffer.extend(&chunk[..read]);
        }

        Ok(self.buffer.take())
    }

    /// Read until `pattern` matches using the default timeout.
    pub async fn read_until_prompt(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        let timeout = self.config.timeout;
        self.read_until_pattern(pattern, timeout).await
    }

    /// Shut down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(ChannelError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_until_prompt() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut channel = PtyChannel::new(client, PtyConfig::default());

        server.write_all(b"Welcome\r\nrouter#").await.unwrap();

        let prompt = Regex::new(r"(?m)^router#\s*$").unwrap();
        let data = channel.read_until_prompt(&prompt).await.unwrap();
        assert_eq!(data, b"Welcome\nrouter#");
    }

    #[tokio::test]
    async fn test_send_appends_return() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut channel = PtyChannel::new(client, PtyConfig::default());

        channel.send("show version").await.unwrap();

        let mut received = [0u8; 13];
        server.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"show version\n");
    }

    #[tokio::test]
    async fn test_scripted_exchange() {
        let mock = tokio_test::io::Builder::new()
            .write(b"show clock\n")
            .read(b"show clock\r\n12:00:01 UTC\r\nrouter#")
            .build();
        let mut channel = PtyChannel::new(mock, PtyConfig::default());

        channel.send("show clock").await.unwrap();
        let prompt = Regex::new(r"(?m)^router#\s*$").unwrap();
        let data = channel.read_until_prompt(&prompt).await.unwrap();
        assert_eq!(data, b"show clock\n12:00:01 UTC\nrouter#");
    }

    #[tokio::test]
    async fn test_pattern_timeout() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut channel = PtyChannel::new(client, PtyConfig::default());
        server.write_all(b"no prompt here").await.unwrap();

        let prompt = Regex::new(r"#\s*$").unwrap();
        let err = channel
            .read_until_pattern(&prompt, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Channel(ChannelError::PatternTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client, server) = tokio::io::duplex(1024);
        let mut channel = PtyChannel::new(client, PtyConfig::default());
        drop(server);

        let prompt = Regex::new(r"#\s*$").unwrap();
        let err = channel.read_until_prompt(&prompt).await.unwrap_err();
        assert!(matches!(err, crate::Error::Channel(ChannelError::Closed)));
    }
}
