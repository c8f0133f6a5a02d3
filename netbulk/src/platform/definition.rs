//! Platform definition for vendor-specific CLI behavior.

use regex::bytes::Regex;

use crate::error::{PlatformError, Result};

/// Everything the CLI driver needs to know about one network OS.
///
/// A platform has two prompt shapes: any prompt at all (operational or
/// configuration mode), and the configuration-mode prompt specifically.
/// Configuration sets enter with `config_enter`, send their lines,
/// run `commit_command` when the platform uses a candidate datastore, and
/// leave with `config_exit`.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_ios", "juniper_junos").
    pub name: String,

    /// Pattern matching any prompt of this platform.
    pub prompt_pattern: Regex,

    /// Pattern matching the configuration-mode prompt.
    pub config_prompt_pattern: Regex,

    /// Commands that enter configuration mode.
    pub config_enter: Vec<String>,

    /// Commands that leave configuration mode.
    pub config_exit: Vec<String>,

    /// Commit command for candidate-datastore platforms.
    pub commit_command: Option<String>,

    /// Commands to run when the session opens (paging, width).
    pub on_open_commands: Vec<String>,

    /// Output fragments that mean the device rejected a command.
    pub failed_when_contains: Vec<String>,

    /// Terminal width requested for the PTY.
    pub terminal_width: u32,
}

impl PlatformDefinition {
    /// Create a platform with the given prompt patterns.
    pub fn new(name: impl Into<String>, prompt: &str, config_prompt: &str) -> Result<Self> {
        let name = name.into();
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| PlatformError::InvalidDefinition {
                message: format!("{name}: {e}"),
            })
        };

        Ok(Self {
            prompt_pattern: compile(prompt)?,
            config_prompt_pattern: compile(config_prompt)?,
            name,
            config_enter: vec![],
            config_exit: vec![],
            commit_command: None,
            on_open_commands: vec![],
            failed_when_contains: vec![],
            terminal_width: 511,
        })
    }

    /// Add a command that enters configuration mode.
    pub fn with_config_enter(mut self, command: impl Into<String>) -> Self {
        self.config_enter.push(command.into());
        self
    }

    /// Add a command that leaves configuration mode.
    pub fn with_config_exit(mut self, command: impl Into<String>) -> Self {
        self.config_exit.push(command.into());
        self
    }

    /// Set the commit command.
    pub fn with_commit(mut self, command: impl Into<String>) -> Self {
        self.commit_command = Some(command.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Set the terminal width.
    pub fn with_terminal_width(mut self, width: u32) -> Self {
        self.terminal_width = width;
        self
    }

    /// Strip the command echo and the trailing prompt from raw output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let mut lines: Vec<&str> = raw.lines().collect();

        if lines
            .first()
            .is_some_and(|first| !command.is_empty() && first.trim_end().ends_with(command.trim()))
        {
            lines.remove(0);
        }

        if lines
            .last()
            .is_some_and(|last| self.prompt_pattern.is_match(last.as_bytes()))
        {
            lines.pop();
        }

        lines.join("\n")
    }

    /// Return the first failure pattern contained in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlatformDefinition {
        PlatformDefinition::new("sample", r"(?m)^\w+[>#]\s*$", r"(?m)^\w+\(config\)#\s*$")
            .unwrap()
            .with_failure_pattern("% Invalid input")
    }

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let platform = sample();
        let raw = "show clock\n12:00:00 UTC\nrouter#";
        assert_eq!(platform.normalize_output(raw, "show clock"), "12:00:00 UTC");
    }

    #[test]
    fn test_normalize_keeps_body_without_echo() {
        let platform = sample();
        let raw = "line one\nline two\nrouter#";
        assert_eq!(platform.normalize_output(raw, "show x"), "line one\nline two");
    }

    #[test]
    fn test_detect_failure() {
        let platform = sample();
        assert_eq!(
            platform.detect_failure("foo\n% Invalid input detected at '^' marker."),
            Some("% Invalid input")
        );
        assert_eq!(platform.detect_failure("all good"), None);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = PlatformDefinition::new("broken", r"(", r"#").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
