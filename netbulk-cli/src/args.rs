//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use netbulk::OutputFormat;

/// Bulk push and retrieval for network devices.
#[derive(Parser, Debug)]
#[command(name = "netbulk")]
#[command(about = "Bulk configuration push and data retrieval over SSH and NETCONF")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Credential key file (generated on first use)
    #[arg(long, global = true, env = "NETBULK_KEY_FILE", default_value = "secret.key")]
    pub key_file: PathBuf,

    /// Encrypted credential store
    #[arg(long, global = true, env = "NETBULK_CRED_FILE", default_value = "creds.dat")]
    pub cred_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a run described by a TOML run file
    Run {
        /// Run file path
        run_file: PathBuf,
    },

    /// Manage stored credentials
    #[command(subcommand)]
    Creds(CredsCommand),

    /// Aggregate saved artifacts into a CSV report
    Report {
        /// Artifact format to aggregate (json, xml, text)
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Regex mapping CSV (Column,Regex), required for text
        #[arg(long)]
        regex: Option<PathBuf>,

        /// Directory holding the artifacts
        #[arg(long, default_value = netbulk::config::DEFAULT_RESULTS_DIR)]
        results: PathBuf,

        /// Directory for the report file
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CredsCommand {
    /// Store a username/password under a section ("main", "jump", ...)
    Save {
        /// Section name
        section: String,

        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "NETBULK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show stored sections with masked passwords
    Show {
        /// Only this section
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_report() {
        let cli = Cli::parse_from([
            "netbulk", "report", "--format", "text", "--regex", "regex.csv",
        ]);
        match cli.command {
            Commands::Report {
                format,
                regex,
                results,
                ..
            } => {
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(regex, Some(PathBuf::from("regex.csv")));
                assert_eq!(results, PathBuf::from("results"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_creds_save() {
        let cli = Cli::parse_from([
            "netbulk",
            "--key-file",
            "k.key",
            "creds",
            "save",
            "jump",
            "--username",
            "ops",
            "--password",
            "pw",
        ]);
        assert_eq!(cli.key_file, PathBuf::from("k.key"));
        match cli.command {
            Commands::Creds(CredsCommand::Save {
                section, username, ..
            }) => {
                assert_eq!(section, "jump");
                assert_eq!(username, "ops");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
