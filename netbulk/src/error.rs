//! Error types for netbulk.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netbulk operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// CLI driver errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Jump-host tunnel errors
    #[error("Tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// NETCONF session errors
    #[error("NETCONF error: {0}")]
    Netconf(#[from] NetconfError),

    /// Credential vault errors
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Inventory loading errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Report generation errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Run configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error outside any specific layer (artifact writes)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to reach the host
    #[error("Host unreachable {host}:{port}: {source}")]
    Unreachable {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Connection to {host}:{port} timed out after {timeout:?}")]
    Timeout {
        host: String,
        port: u16,
        timeout: Duration,
    },
}

/// Channel layer errors (prompt matching, PTY reads).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// I/O error on the channel stream
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Driver layer errors (command execution, configuration sets).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Device rejected a command
    #[error("Command '{command}' rejected: {message}")]
    CommandRejected { command: String, message: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Platform name not found
    #[error("Unknown platform: '{name}'")]
    UnknownPlatform { name: String },

    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },
}

/// Jump-host tunnel errors.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The multiplexer was already closed
    #[error("Tunnel multiplexer is closed")]
    Closed,

    /// Local listener could not be bound
    #[error("Failed to bind local listener: {0}")]
    Bind(#[source] io::Error),

    /// The jump host refused the forwarded channel
    #[error("Channel to {host}:{port} refused: {message}")]
    ChannelRefused {
        host: String,
        port: u16,
        message: String,
    },
}

/// NETCONF protocol errors.
#[derive(Error, Debug)]
pub enum NetconfError {
    /// Malformed framing on the wire
    #[error("Framing error: {0}")]
    Framing(String),

    /// Server reply was not parseable
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// Configuration payload is not an XML element
    #[error("Invalid configuration payload: {0}")]
    InvalidPayload(String),

    /// Server replied with one or more rpc-error elements
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Timed out waiting for a message
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// Session stream closed before a full message arrived
    #[error("Session closed")]
    Closed,

    /// I/O error on the subsystem stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Credential vault errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Key or data file I/O failed
    #[error("Vault I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Key file content is not a valid key
    #[error("Invalid key file {0}")]
    InvalidKey(PathBuf),

    /// Encryption or decryption failed (wrong key, tampered data)
    #[error("Cryptographic failure: {0}")]
    Crypto(String),

    /// Decrypted data is not a credential record
    #[error("Malformed credential data: {0}")]
    Malformed(#[from] serde_json::Error),

    /// No data file exists yet
    #[error("No credential data stored")]
    Empty,
}

/// Template rendering errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template file could not be read
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Template failed to parse or render
    #[error("Failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Inventory loading errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Inventory file could not be read or parsed
    #[error("Failed to read inventory: {0}")]
    Csv(#[from] csv::Error),

    /// A port cell held something other than a TCP port
    #[error("Invalid port '{value}'")]
    InvalidPort { value: String },
}

/// Report generation errors.
///
/// Each variant is a distinct reporting status rather than a crash.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Text reports need a regex mapping
    #[error("Regex file missing.")]
    RegexSourceMissing,

    /// The regex mapping could not be loaded
    #[error("Invalid regex file: {0}")]
    RegexSource(String),

    /// The results directory does not exist
    #[error("No results folder found.")]
    NoResults,

    /// No artifact produced a row
    #[error("No data extracted.")]
    NoData,

    /// Writing the report failed
    #[error("Failed to write report: {0}")]
    Write(#[from] csv::Error),

    /// Filesystem error while scanning
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Run configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting was not provided
    #[error("Missing setting: {0}")]
    Missing(&'static str),

    /// Settings that cannot be combined
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Run file did not parse
    #[error("Failed to parse run file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type alias using netbulk's Error.
pub type Result<T> = std::result::Result<T, Error>;
