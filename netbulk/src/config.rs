//! Run configuration.
//!
//! A run is described once by an immutable [`RunParameters`] value, built
//! either in code through [`RunParameters::builder`] or from a TOML
//! [`RunFile`]. Both paths go through the same validation.
//!
//! ```toml
//! mode = "retrieve"
//! protocol = "ssh"
//! inventory = "devices.csv"
//! command = "show version | json"
//! vendor = "Cisco NX-OS"
//! format = "json"
//! auto_report = true
//!
//! [credentials]
//! username = "admin"
//! password = "secret"
//!
//! [jump]
//! host = "bastion.example.net"
//! username = "ops"
//! password = "secret"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::transport::SshConfig;
use crate::vault::Credential;

/// Default jump-host connect timeout.
pub const DEFAULT_JUMP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default directory for result artifacts.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Operation performed on every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Render a template and apply it.
    Push,

    /// Run one command and save its output.
    #[default]
    Retrieve,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Retrieve => write!(f, "retrieve"),
        }
    }
}

/// Management protocol used to reach devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    #[serde(alias = "SSH")]
    Ssh,

    #[serde(alias = "NETCONF")]
    Netconf,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => write!(f, "SSH"),
            Self::Netconf => write!(f, "NETCONF"),
        }
    }
}

/// Format retrieved output is stored (and reported) in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "JSON")]
    Json,

    #[serde(alias = "XML")]
    Xml,

    #[serde(alias = "Text", alias = "TEXT", alias = "txt")]
    Text,
}

impl OutputFormat {
    /// Artifact file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Text => "txt",
        }
    }

    /// Label used in report file names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Text => "Text",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "text" | "txt" => Ok(Self::Text),
            other => Err(ConfigError::Invalid(format!("unknown format '{other}'"))),
        }
    }
}

/// What each device is given: a template to push or a command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    Template(PathBuf),
    Command(String),
}

/// Jump-host connection settings.
#[derive(Debug, Clone)]
pub struct JumpHost {
    pub host: String,
    pub port: u16,
    pub credential: Credential,
    pub timeout: Duration,
}

impl JumpHost {
    pub fn new(host: impl Into<String>, credential: Credential) -> Self {
        Self {
            host: host.into(),
            port: 22,
            credential,
            timeout: DEFAULT_JUMP_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// SSH settings for the jump-host session.
    pub fn ssh_config(&self) -> SshConfig {
        SshConfig::new(
            self.host.clone(),
            self.port,
            self.credential.username.clone(),
            self.credential.password.clone(),
        )
        .with_timeout(self.timeout)
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct RunParameters {
    mode: Mode,
    protocol: Protocol,
    inventory: PathBuf,
    task: TaskSource,
    vendor: Option<String>,
    credential: Credential,
    jump: Option<JumpHost>,
    format: OutputFormat,
    auto_report: bool,
    regex_source: Option<PathBuf>,
    results_dir: PathBuf,
    report_dir: PathBuf,
}

impl RunParameters {
    /// Start building run parameters.
    pub fn builder() -> RunParametersBuilder {
        RunParametersBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn inventory(&self) -> &Path {
        &self.inventory
    }

    pub fn task(&self) -> &TaskSource {
        &self.task
    }

    /// Vendor selection used when a row has no `device_type`.
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    /// Device credentials.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn jump(&self) -> Option<&JumpHost> {
        self.jump.as_ref()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Whether a report is built after a retrieve run.
    pub fn auto_report(&self) -> bool {
        self.auto_report
    }

    pub fn regex_source(&self) -> Option<&Path> {
        self.regex_source.as_deref()
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }
}

/// Builder for [`RunParameters`].
#[derive(Debug, Default)]
pub struct RunParametersBuilder {
    mode: Mode,
    protocol: Protocol,
    inventory: Option<PathBuf>,
    template: Option<PathBuf>,
    command: Option<String>,
    vendor: Option<String>,
    credential: Option<Credential>,
    jump: Option<JumpHost>,
    format: OutputFormat,
    auto_report: bool,
    regex_source: Option<PathBuf>,
    results_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
}

impl RunParametersBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory = Some(path.into());
        self
    }

    /// Template rendered per device in push mode.
    pub fn template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    /// Command run per device in retrieve mode.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Vendor display name (`"Cisco XR"`) or platform name.
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn credential(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.credential = Some(Credential::new(username, password));
        self
    }

    pub fn jump_host(mut self, jump: JumpHost) -> Self {
        self.jump = Some(jump);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn auto_report(mut self, enabled: bool) -> Self {
        self.auto_report = enabled;
        self
    }

    /// Regex mapping file for text reports.
    pub fn regex_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.regex_source = Some(path.into());
        self
    }

    pub fn results_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(path.into());
        self
    }

    pub fn report_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(path.into());
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<RunParameters> {
        let inventory = self.inventory.ok_or(ConfigError::Missing("inventory"))?;
        let credential = self.credential.ok_or(ConfigError::Missing("credentials"))?;

        if self.protocol == Protocol::Netconf && self.mode != Mode::Push {
            return Err(ConfigError::Invalid("NETCONF runs support push mode only".into()).into());
        }

        let task = match self.mode {
            Mode::Push => TaskSource::Template(self.template.ok_or(ConfigError::Missing("template"))?),
            Mode::Retrieve => {
                let command = self
                    .command
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(ConfigError::Missing("command"))?;
                TaskSource::Command(command)
            }
        };

        if self.mode == Mode::Retrieve
            && self.auto_report
            && self.format == OutputFormat::Text
            && self.regex_source.is_none()
        {
            return Err(ConfigError::Invalid(
                "text reports need a regex source".into(),
            )
            .into());
        }

        Ok(RunParameters {
            mode: self.mode,
            protocol: self.protocol,
            inventory,
            task,
            vendor: self.vendor,
            credential,
            jump: self.jump,
            format: self.format,
            auto_report: self.auto_report,
            regex_source: self.regex_source,
            results_dir: self
                .results_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
            report_dir: self.report_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

/// Username/password as written in a run file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialEntry {
    pub username: String,
    pub password: String,
}

/// `[jump]` table of a run file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JumpEntry {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_jump_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    22
}

fn default_jump_timeout_secs() -> u64 {
    DEFAULT_JUMP_TIMEOUT.as_secs()
}

/// TOML run description.
///
/// Credentials may be left out; [`RunFile::into_parameters`] then falls
/// back to the stored ones it is given.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub protocol: Protocol,
    pub inventory: PathBuf,
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub auto_report: bool,
    #[serde(default)]
    pub regex: Option<PathBuf>,
    #[serde(default)]
    pub results_dir: Option<PathBuf>,
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
    #[serde(default)]
    pub credentials: Option<CredentialEntry>,
    #[serde(default)]
    pub jump: Option<JumpEntry>,
}

impl RunFile {
    /// Read and parse a run file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        text.parse()
    }

    /// Validate into run parameters.
    ///
    /// `stored_main` and `stored_jump` fill in credentials the file does
    /// not carry.
    pub fn into_parameters(
        self,
        stored_main: Option<Credential>,
        stored_jump: Option<Credential>,
    ) -> Result<RunParameters> {
        let credential = match self.credentials {
            Some(entry) => Credential::new(entry.username, SecretString::from(entry.password)),
            None => stored_main.ok_or(ConfigError::Missing("credentials"))?,
        };

        let mut builder = RunParameters::builder()
            .mode(self.mode)
            .protocol(self.protocol)
            .inventory(self.inventory)
            .format(self.format)
            .auto_report(self.auto_report)
            .credential(credential.username, credential.password);

        if let Some(template) = self.template {
            builder = builder.template(template);
        }
        if let Some(command) = self.command {
            builder = builder.command(command);
        }
        if let Some(vendor) = self.vendor {
            builder = builder.vendor(vendor);
        }
        if let Some(regex) = self.regex {
            builder = builder.regex_source(regex);
        }
        if let Some(dir) = self.results_dir {
            builder = builder.results_dir(dir);
        }
        if let Some(dir) = self.report_dir {
            builder = builder.report_dir(dir);
        }

        if let Some(jump) = self.jump {
            let credential = match (jump.username, jump.password) {
                (Some(username), Some(password)) => {
                    Credential::new(username, SecretString::from(password))
                }
                _ => stored_jump.ok_or(ConfigError::Missing("jump host credentials"))?,
            };
            builder = builder.jump_host(
                JumpHost::new(jump.host, credential)
                    .with_port(jump.port)
                    .with_timeout(Duration::from_secs(jump.timeout_secs)),
            );
        }

        builder.build()
    }
}

impl FromStr for RunFile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s).map_err(ConfigError::Parse)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn retrieve() -> RunParametersBuilder {
        RunParameters::builder()
            .inventory("devices.csv")
            .command("show version")
            .credential("admin", SecretString::from("secret"))
    }

    #[test]
    fn test_builder_defaults() {
        let params = retrieve().build().unwrap();
        assert_eq!(params.mode(), Mode::Retrieve);
        assert_eq!(params.protocol(), Protocol::Ssh);
        assert_eq!(params.format(), OutputFormat::Json);
        assert_eq!(params.results_dir(), Path::new("results"));
        assert_eq!(params.report_dir(), Path::new("."));
        assert_eq!(params.task(), &TaskSource::Command("show version".into()));
        assert!(params.jump().is_none());
    }

    #[test]
    fn test_push_needs_template() {
        let err = retrieve().mode(Mode::Push).build().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("template"))));

        let params = retrieve()
            .mode(Mode::Push)
            .template("base.j2")
            .build()
            .unwrap();
        assert_eq!(params.task(), &TaskSource::Template("base.j2".into()));
    }

    #[test]
    fn test_retrieve_needs_command() {
        let err = RunParameters::builder()
            .inventory("devices.csv")
            .command("  ")
            .credential("admin", SecretString::from("secret"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("command"))));
    }

    #[test]
    fn test_netconf_retrieve_rejected() {
        let err = retrieve().protocol(Protocol::Netconf).build().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_text_report_needs_regex() {
        let err = retrieve()
            .format(OutputFormat::Text)
            .auto_report(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));

        assert!(
            retrieve()
                .format(OutputFormat::Text)
                .auto_report(true)
                .regex_source("regex.csv")
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Xml.extension(), "xml");
        assert_eq!(OutputFormat::Text.label(), "Text");
    }

    #[test]
    fn test_run_file_with_stored_credentials() {
        let file: RunFile = r#"
            mode = "push"
            protocol = "netconf"
            inventory = "devices.csv"
            template = "system.xml"

            [jump]
            host = "bastion"
            port = 2222
        "#
        .parse()
        .unwrap();

        let params = file
            .into_parameters(
                Some(Credential::new("admin", SecretString::from("a"))),
                Some(Credential::new("ops", SecretString::from("b"))),
            )
            .unwrap();

        assert_eq!(params.protocol(), Protocol::Netconf);
        assert_eq!(params.credential().username, "admin");
        let jump = params.jump().unwrap();
        assert_eq!(jump.port, 2222);
        assert_eq!(jump.credential.username, "ops");
        assert_eq!(jump.timeout, DEFAULT_JUMP_TIMEOUT);
        assert_eq!(jump.ssh_config().password.expose_secret(), "b");
    }

    #[test]
    fn test_run_file_missing_credentials() {
        let file: RunFile = "inventory = \"d.csv\"\ncommand = \"show clock\"\n".parse().unwrap();
        let err = file.into_parameters(None, None).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("credentials"))));
    }

    #[test]
    fn test_run_file_rejects_unknown_keys() {
        let err = "inventory = \"d.csv\"\nprotocl = \"ssh\"\n"
            .parse::<RunFile>()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
