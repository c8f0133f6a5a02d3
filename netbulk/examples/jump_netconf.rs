//! NETCONF through a jump host
//!
//! Connects to a bastion, forwards a local port to a device's NETCONF
//! port, and applies an `edit-config` payload read from a file. The tunnel
//! is closed as a unit at the end.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example jump_netconf -- --jump bastion --jump-user ops \
//!     --device 10.0.0.5 --user admin --config mtu.xml
//! ```
//!
//! Passwords come from `JUMP_PASSWORD` and `DEVICE_PASSWORD`.

use std::env;
use std::path::PathBuf;

use netbulk::{NetconfSession, SshConfig, TunnelMultiplexer};
use secrecy::SecretString;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let payload = std::fs::read_to_string(&args.config)?;

    println!("=== netbulk jump_netconf Example ===\n");
    println!("Connecting to jump host {}...", args.jump);

    let jump = SshConfig::new(
        args.jump.clone(),
        22,
        args.jump_user.clone(),
        SecretString::from(env::var("JUMP_PASSWORD").unwrap_or_default()),
    );
    let mut tunnel = TunnelMultiplexer::connect(jump).await?;

    let local_port = tunnel.forward(&args.device, args.port).await?;
    println!("Forwarding 127.0.0.1:{local_port} -> {}:{}", args.device, args.port);

    let device = SshConfig::new(
        "127.0.0.1",
        local_port,
        args.user.clone(),
        SecretString::from(env::var("DEVICE_PASSWORD").unwrap_or_default()),
    );

    let result = async {
        let mut session = NetconfSession::connect(device).await?;
        println!(
            "Session {} ({} framing)",
            session.server_hello().session_id.as_deref().unwrap_or("?"),
            if session.server_hello().supports_base_1_1() { "chunked" } else { "end-of-message" }
        );

        let reply = session.edit_config(&payload).await;
        session.close().await?;
        reply
    }
    .await;

    tunnel.close().await;

    match result {
        Ok(reply) => println!("\nrpc-reply:\n{reply}"),
        Err(e) => eprintln!("\nedit-config failed: {e}"),
    }

    Ok(())
}

struct Args {
    jump: String,
    jump_user: String,
    device: String,
    port: u16,
    user: String,
    config: PathBuf,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            jump: "localhost".to_string(),
            jump_user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            device: "127.0.0.1".to_string(),
            port: 830,
            user: "admin".to_string(),
            config: PathBuf::from("config.xml"),
        };

        let mut i = 1;
        while i + 1 < args.len() {
            let value = args[i + 1].clone();
            match args[i].as_str() {
                "--jump" => parsed.jump = value,
                "--jump-user" => parsed.jump_user = value,
                "--device" => parsed.device = value,
                "--port" => parsed.port = value.parse().unwrap_or(830),
                "--user" => parsed.user = value,
                "--config" => parsed.config = PathBuf::from(value),
                other => eprintln!("Unknown argument: {other}"),
            }
            i += 2;
        }

        parsed
    }
}
