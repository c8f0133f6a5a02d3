//! Prompt-driven CLI session for any platform definition.

use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::response::Response;
use super::{GLOBAL_DELAY_FACTOR, READ_TIMEOUT};
use crate::channel::{PtyChannel, PtyConfig};
use crate::error::{ChannelError, DriverError, Error, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshStream, SshTransport};

/// Base inter-command delay, multiplied by the delay factor.
const BASE_DELAY: Duration = Duration::from_millis(100);

/// How long to wait for an unsolicited prompt before nudging the device.
const INITIAL_PROMPT_WAIT: Duration = Duration::from_secs(5);

/// Interactive CLI session on one device.
///
/// Handles:
/// - waiting for the initial prompt and running the platform's on-open
///   commands (paging off, terminal width)
/// - single commands with echo/prompt normalization and failure detection
/// - configuration sets as a transaction: enter, lines, commit, exit
pub struct CliSession<S = SshStream> {
    /// SSH transport (None for sessions over a bare stream).
    transport: Option<SshTransport>,

    /// PTY channel carrying the shell.
    channel: PtyChannel<S>,

    /// Platform definition.
    platform: PlatformDefinition,

    /// Multiplier applied to the inter-command delay in configuration sets.
    delay_factor: u32,
}

impl CliSession<SshStream> {
    /// Connect over SSH, open a PTY shell, and prepare the session.
    pub async fn connect(config: SshConfig, platform: PlatformDefinition) -> Result<Self> {
        let config = config.with_terminal_size(platform.terminal_width, 24);
        let transport = SshTransport::connect(config).await?;
        let stream = transport.open_shell().await?;

        let mut session = Self::over_stream(stream, platform);
        session.transport = Some(transport);
        session.open().await?;
        Ok(session)
    }
}

impl<S> CliSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open shell stream. Call [`open`](Self::open) next.
    pub fn over_stream(stream: S, platform: PlatformDefinition) -> Self {
        let config = PtyConfig {
            timeout: READ_TIMEOUT,
            ..PtyConfig::default()
        };

        Self {
            transport: None,
            channel: PtyChannel::new(stream, config),
            platform,
            delay_factor: GLOBAL_DELAY_FACTOR,
        }
    }

    /// Override the delay factor.
    pub fn with_delay_factor(mut self, factor: u32) -> Self {
        self.delay_factor = factor;
        self
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Wait for the first prompt and run the on-open commands.
    pub async fn open(&mut self) -> Result<()> {
        let prompt = self.platform.prompt_pattern.clone();

        match self
            .channel
            .read_until_pattern(&prompt, INITIAL_PROMPT_WAIT)
            .await
        {
            Ok(_) => {}
            Err(Error::Channel(ChannelError::PatternTimeout(_))) => {
                debug!("No prompt yet, sending return");
                self.channel.send("").await?;
                self.channel.read_until_prompt(&prompt).await?;
            }
            Err(e) => return Err(e),
        }

        for command in self.platform.on_open_commands.clone() {
            let response = self.send_command(&command).await?;
            if !response.is_success() {
                warn!("on-open command '{command}' was rejected");
            }
        }

        Ok(())
    }

    /// Send a command and wait for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();

        self.channel.send(command).await?;
        let data = self
            .channel
            .read_until_prompt(&self.platform.prompt_pattern)
            .await?;

        let raw_result = String::from_utf8_lossy(&data).to_string();
        let result = self.platform.normalize_output(&raw_result, command);
        let failure = self.platform.detect_failure(&result).map(str::to_string);

        Ok(Response::new(
            command,
            result,
            raw_result,
            start.elapsed(),
            failure,
        ))
    }

    /// Apply configuration lines as one configuration-mode transaction.
    ///
    /// Returns every response in order (entry, lines, commit, exit). The
    /// first rejected line aborts the set with
    /// [`DriverError::CommandRejected`], as does an entry command that
    /// leaves the device outside its configuration prompt.
    pub async fn send_config_set(&mut self, lines: &[String]) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(lines.len() + 3);

        for command in self.platform.config_enter.clone() {
            responses.push(self.send_checked(&command).await?);
        }

        // Lines sent outside configuration mode would run as exec commands.
        if let Some(entered) = responses.last() {
            if !self
                .platform
                .config_prompt_pattern
                .is_match(entered.raw_result.as_bytes())
            {
                return Err(DriverError::CommandRejected {
                    command: entered.command.clone(),
                    message: "configuration prompt not reached".to_string(),
                }
                .into());
            }
        }

        let delay = BASE_DELAY * self.delay_factor;
        for line in lines {
            tokio::time::sleep(delay).await;
            responses.push(self.send_checked(line).await?);
        }

        if let Some(commit) = self.platform.commit_command.clone() {
            responses.push(self.send_checked(&commit).await?);
        }

        for command in self.platform.config_exit.clone() {
            responses.push(self.send_checked(&command).await?);
        }

        Ok(responses)
    }

    /// Close the session and its SSH transport.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.channel.shutdown().await {
            debug!("Shell shutdown: {e}");
        }
        if let Some(transport) = self.transport.take() {
            transport.disconnect().await?;
        }
        Ok(())
    }

    async fn send_checked(&mut self, command: &str) -> Result<Response> {
        self.send_command(command).await?.into_checked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformRegistry;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    /// Minimal IOS-like device: echoes commands and answers from a script.
    async fn fake_ios(stream: DuplexStream) -> Vec<String> {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();
        let mut prompt = "router#";

        write.write_all(b"\r\nWelcome\r\nrouter#").await.unwrap();

        while let Ok(Some(line)) = lines.next_line().await {
            let output = match line.as_str() {
                "configure terminal" => {
                    prompt = "router(config)#";
                    "Enter configuration commands, one per line."
                }
                "end" => {
                    prompt = "router#";
                    ""
                }
                "show version" => "Version 1.2",
                l if l.starts_with("bogus") => "% Invalid input detected at '^' marker.",
                _ => "",
            };
            received.push(line.clone());

            let reply = if output.is_empty() {
                format!("{line}\r\n{prompt}")
            } else {
                format!("{line}\r\n{output}\r\n{prompt}")
            };
            if write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }

        received
    }

    async fn open_session() -> (CliSession<DuplexStream>, tokio::task::JoinHandle<Vec<String>>) {
        let (client, server) = tokio::io::duplex(4096);
        let device = tokio::spawn(fake_ios(server));

        let platform = PlatformRegistry::lookup("cisco_ios").unwrap();
        let mut session = CliSession::over_stream(client, platform).with_delay_factor(0);
        session.open().await.unwrap();
        (session, device)
    }

    #[tokio::test]
    async fn test_open_runs_on_open_commands() {
        let (session, device) = open_session().await;
        session.close().await.unwrap();

        let received = device.await.unwrap();
        assert_eq!(received, vec!["terminal length 0", "terminal width 512"]);
    }

    #[tokio::test]
    async fn test_send_command_normalizes() {
        let (mut session, _device) = open_session().await;

        let response = session.send_command("show version").await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.result, "Version 1.2");
        assert!(response.raw_result.ends_with("router#"));
    }

    #[tokio::test]
    async fn test_config_set_enters_and_exits() {
        let (mut session, device) = open_session().await;

        let lines = vec![
            "interface Gi0/1".to_string(),
            "description uplink".to_string(),
        ];
        let responses = session.send_config_set(&lines).await.unwrap();
        assert_eq!(responses.len(), 4);
        session.close().await.unwrap();

        let received = device.await.unwrap();
        assert_eq!(
            &received[2..],
            &[
                "configure terminal",
                "interface Gi0/1",
                "description uplink",
                "end"
            ]
        );
    }

    #[tokio::test]
    async fn test_config_set_rejected_line() {
        let (mut session, _device) = open_session().await;

        let lines = vec!["bogus command".to_string()];
        let err = session.send_config_set(&lines).await.unwrap_err();
        match err {
            Error::Driver(DriverError::CommandRejected { command, message }) => {
                assert_eq!(command, "bogus command");
                assert!(message.contains("% Invalid input detected"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_config_set_requires_config_prompt() {
        let (client, server) = tokio::io::duplex(4096);
        let device = tokio::spawn(fake_ios(server));

        // An entry command that keeps the exec prompt.
        let mut platform = PlatformRegistry::lookup("cisco_ios").unwrap();
        platform.config_enter = vec!["show version".to_string()];
        let mut session = CliSession::over_stream(client, platform).with_delay_factor(0);
        session.open().await.unwrap();

        let lines = vec!["interface Gi0/1".to_string()];
        let err = session.send_config_set(&lines).await.unwrap_err();
        match err {
            Error::Driver(DriverError::CommandRejected { command, message }) => {
                assert_eq!(command, "show version");
                assert_eq!(message, "configuration prompt not reached");
            }
            other => panic!("unexpected error: {other}"),
        }
        session.close().await.unwrap();

        let received = device.await.unwrap();
        assert!(!received.iter().any(|line| line == "interface Gi0/1"));
    }
}
