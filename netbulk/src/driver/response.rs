//! Output of one CLI command.

use std::time::Duration;

use crate::error::{DriverError, Result};

/// One command's output, read up to the next prompt.
#[derive(Debug, Clone)]
pub struct Response {
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// Cleaned output including echo and prompt.
    pub raw_result: String,

    pub elapsed: Duration,

    /// Platform failure string found in `result`.
    pub failure_message: Option<String>,
}

impl Response {
    pub(crate) fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        elapsed: Duration,
        failure_message: Option<String>,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            elapsed,
            failure_message,
        }
    }

    /// True when no failure string was found.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Turn a rejected command into [`DriverError::CommandRejected`].
    ///
    /// The error message carries the matched failure string and the
    /// device's output so operators see why the line was refused.
    pub(crate) fn into_checked(mut self) -> Result<Self> {
        match self.failure_message.take() {
            None => Ok(self),
            Some(pattern) => Err(DriverError::CommandRejected {
                message: format!("{pattern} ({})", self.result.trim()),
                command: self.command,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_into_checked_rejects_failure() {
        let response = Response::new(
            "vlan 5000",
            "% Invalid input detected at '^' marker.",
            "vlan 5000\n% Invalid input detected at '^' marker.\nrouter(config)#",
            Duration::from_millis(12),
            Some("% Invalid input detected".to_string()),
        );

        match response.into_checked().unwrap_err() {
            Error::Driver(DriverError::CommandRejected { command, message }) => {
                assert_eq!(command, "vlan 5000");
                assert_eq!(
                    message,
                    "% Invalid input detected (% Invalid input detected at '^' marker.)"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_into_checked_passes_clean_output() {
        let response = Response::new("vlan 10", "", "vlan 10\nrouter(config)#", Duration::ZERO, None);
        assert!(response.is_success());
        assert_eq!(response.into_checked().unwrap().command, "vlan 10");
    }
}
