//! Single-device CLI example
//!
//! Connects to one device, runs a command and prints the output re-encoded
//! the way a retrieve run would store it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example show_command -- --host 192.168.1.1 --user admin --password secret \
//!     --platform cisco_nxos --command "show version | json" --format json
//! ```

use std::env;

use netbulk::adapter::format_output;
use netbulk::platform::PlatformRegistry;
use netbulk::{CliSession, OutputFormat, SshConfig};
use secrecy::SecretString;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== netbulk show_command Example ===\n");
    println!("Connecting to {}:{} as {}...", args.host, args.port, args.platform);

    let platform = PlatformRegistry::lookup(&args.platform)?;
    let config = SshConfig::new(
        args.host.clone(),
        args.port,
        args.user.clone(),
        SecretString::from(args.password.clone()),
    );

    let mut session = CliSession::connect(config, platform).await?;
    println!("Connected!");

    println!("\nExecuting: {}", args.command);
    println!("{}", "-".repeat(50));

    let response = session.send_command(&args.command).await?;
    if let Some(failure) = &response.failure_message {
        eprintln!("Device rejected the command: {failure}");
    }
    println!("{}", format_output(&response.result, args.format));

    println!("{}", "-".repeat(50));
    println!("Command completed in {:?}", response.elapsed);

    session.close().await?;
    println!("Done!");

    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    platform: String,
    command: String,
    format: OutputFormat,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: env::var("NETBULK_PASSWORD").unwrap_or_default(),
            platform: netbulk::platform::DEFAULT_PLATFORM.to_string(),
            command: "show version".to_string(),
            format: OutputFormat::Text,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match (args[i].as_str(), value) {
                ("--host" | "-h", Some(v)) => parsed.host = v,
                ("--port" | "-p", Some(v)) => parsed.port = v.parse().unwrap_or(22),
                ("--user" | "-u", Some(v)) => parsed.user = v,
                ("--password" | "-P", Some(v)) => parsed.password = v,
                ("--platform", Some(v)) => parsed.platform = v,
                ("--command" | "-c", Some(v)) => parsed.command = v,
                ("--format" | "-f", Some(v)) => parsed.format = v.parse().unwrap_or_default(),
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                (other, _) => {
                    eprintln!("Unknown argument: {other}");
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"netbulk show_command example

USAGE:
    cargo run --example show_command -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Target host [default: localhost]
    -p, --port <PORT>          SSH port [default: 22]
    -u, --user <USER>          Username [default: $USER]
    -P, --password <PASS>      Password [default: $NETBULK_PASSWORD]
    --platform <NAME>          Platform name [default: cisco_ios]
    -c, --command <CMD>        Command to run [default: show version]
    -f, --format <FORMAT>      json, xml or text [default: text]
    --help                     Print this help message
"#
        );
    }
}
