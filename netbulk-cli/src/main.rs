//! netbulk command-line runner.
//!
//! ```bash
//! netbulk creds save main --username admin --password secret
//! netbulk creds save jump --username ops --password secret
//! netbulk run run.toml
//! netbulk report --format xml --results results
//! ```

mod args;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::debug;
use secrecy::{ExposeSecret, SecretString};

use netbulk::vault::{JUMP_SECTION, MAIN_SECTION};
use netbulk::{CredentialVault, Orchestrator, ReportRequest, RunFile, build_report};

use args::{Cli, Commands, CredsCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Run { run_file } => {
            let vault = CredentialVault::initialize(&cli.key_file, &cli.cred_file)
                .context("Failed to open credential vault")?;
            let params = RunFile::load(&run_file)
                .with_context(|| format!("Failed to load {}", run_file.display()))?
                .into_parameters(vault.load(MAIN_SECTION), vault.load(JUMP_SECTION))?;
            debug!("Run parameters: {params:?}");

            let report = Orchestrator::new(params).spawn().await?;
            println!("{report}");
            for row in report.rows.iter().filter(|row| row.is_failure()) {
                println!("  {row}");
            }

            if !report.is_success() {
                bail!(
                    "run did not complete: {}",
                    report.abort_reason.as_deref().unwrap_or("unknown reason")
                );
            }
        }

        Commands::Creds(CredsCommand::Save {
            section,
            username,
            password,
        }) => {
            let vault = CredentialVault::initialize(&cli.key_file, &cli.cred_file)
                .context("Failed to open credential vault")?;
            vault
                .try_save(&section, &username, &SecretString::from(password))
                .with_context(|| format!("Failed to save '{section}' credentials"))?;
            println!("Saved '{section}' credentials to {}", cli.cred_file.display());
        }

        Commands::Creds(CredsCommand::Show { section }) => {
            let vault = CredentialVault::initialize(&cli.key_file, &cli.cred_file)
                .context("Failed to open credential vault")?;
            let sections = match section {
                Some(section) => vec![section],
                None => vault.sections(),
            };
            if sections.is_empty() {
                println!("No stored credentials in {}", cli.cred_file.display());
            }
            for section in sections {
                match vault.load(&section) {
                    Some(credential) => println!(
                        "{section}: {} / {}",
                        credential.username,
                        mask(credential.password.expose_secret())
                    ),
                    None => println!("{section}: (not stored)"),
                }
            }
        }

        Commands::Report {
            format,
            regex,
            results,
            out,
        } => {
            let mut request = ReportRequest::new(format, results).with_output_dir(out);
            if let Some(regex) = regex {
                request = request.with_regex_source(regex);
            }
            let summary = build_report(&request)?;
            println!("{summary}");
        }
    }

    Ok(())
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count().clamp(4, 12))
}
