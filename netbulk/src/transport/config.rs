//! SSH connection configuration.

use std::time::Duration;

use secrecy::SecretString;

/// SSH connection configuration.
///
/// Authentication is username/password only. Host keys are accepted without
/// verification: sessions often ride a jump-host tunnel whose loopback
/// address says nothing about the device behind it.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: SecretString,

    /// Connection timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl SshConfig {
    /// Create a configuration with default timeout and terminal size.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Set the connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SshConfig::new("10.0.0.5", 22, "admin", SecretString::from("secret"));
        assert_eq!(config.socket_addr(), "10.0.0.5:22");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.terminal_width, 511);
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let config = SshConfig::new("r1", 2222, "admin", SecretString::from("hunter2"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
