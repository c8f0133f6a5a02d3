//! Run orchestration.
//!
//! An [`Orchestrator`] drives one run: connect the jump host when one is
//! configured, then walk the inventory one row at a time, each row opening
//! its own device session (through a tunnel forward when jumping), and
//! finally aggregate the artifacts into a report when asked to.
//!
//! A failing row never stops the run. Only a jump-host failure does, and
//! the tunnel is released on every exit path.
//!
//! ```no_run
//! use netbulk::{Orchestrator, RunParameters};
//! use secrecy::SecretString;
//!
//! # async fn example() -> netbulk::Result<()> {
//! let params = RunParameters::builder()
//!     .inventory("devices.csv")
//!     .command("show version")
//!     .credential("admin", SecretString::from("secret"))
//!     .build()?;
//!
//! let report = Orchestrator::new(params).run().await;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

mod outcome;
mod progress;

pub use outcome::{BatchReport, RowOutcome, RowStage, RunState};
pub use progress::{LogProgress, PROGRESS_TARGET, ProgressSink};

use std::path::PathBuf;

use log::{debug, error, warn};
use tokio::task::JoinHandle;

use crate::adapter::{DeviceBackend, DeviceTarget, NetworkBackend, push_netconf, push_ssh, retrieve_ssh};
use crate::config::{OutputFormat, Protocol, RunParameters, TaskSource};
use crate::inventory::{InventoryRow, load_inventory};
use crate::platform::{DEFAULT_PLATFORM, platform_for_vendor};
use crate::report::{ReportRequest, build_report};
use crate::template;
use crate::tunnel::Forwarder;

const LOOPBACK: &str = "127.0.0.1";

/// Drives one run over a [`DeviceBackend`].
pub struct Orchestrator<B = NetworkBackend, P = LogProgress> {
    backend: B,
    params: RunParameters,
    progress: P,
    state: RunState,
}

impl Orchestrator<NetworkBackend, LogProgress> {
    /// Orchestrator over real devices, reporting progress to the log.
    pub fn new(params: RunParameters) -> Self {
        Self::with_backend(NetworkBackend::new(), params)
    }
}

impl<B: DeviceBackend> Orchestrator<B, LogProgress> {
    pub fn with_backend(backend: B, params: RunParameters) -> Self {
        Self {
            backend,
            params,
            progress: LogProgress,
            state: RunState::Idle,
        }
    }
}

impl<B: DeviceBackend, P: ProgressSink> Orchestrator<B, P> {
    /// Send progress lines to `progress` instead.
    pub fn with_progress<Q: ProgressSink>(self, progress: Q) -> Orchestrator<B, Q> {
        Orchestrator {
            backend: self.backend,
            params: self.params,
            progress,
            state: self.state,
        }
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run on a new tokio task.
    pub fn spawn(self) -> JoinHandle<BatchReport>
    where
        B: 'static,
        B::Tunnel: 'static,
        P: 'static,
    {
        tokio::spawn(self.run())
    }

    /// Execute the whole run.
    pub async fn run(mut self) -> BatchReport {
        let mut report = BatchReport::default();
        self.emit(format!(
            "--- STARTING {} ---",
            self.params.mode().to_string().to_uppercase()
        ));

        let mut tunnel = None;
        if let Some(jump) = self.params.jump().cloned() {
            self.transition(RunState::JumpConnecting);
            self.emit(format!("Connecting to Jump Host {}...", jump.host));

            match self.backend.connect_jump(&jump).await {
                Ok(connected) => {
                    self.emit("Jump Host Connected.".to_string());
                    tunnel = Some(connected);
                }
                Err(e) => {
                    error!("Jump host {} failed: {e}", jump.host);
                    self.emit(format!("Jump Error: {e}"));
                    self.transition(RunState::Failed);
                    report.state = RunState::Failed;
                    report.abort_reason = Some(e.to_string());
                    return report;
                }
            }
        }

        self.transition(RunState::ProcessingRows);
        match load_inventory(self.params.inventory()) {
            Ok(rows) => {
                for row in &rows {
                    let outcome = self.process_row(row, tunnel.as_mut()).await;
                    report.rows.push(outcome);
                }

                if self.wants_report() {
                    self.transition(RunState::Reporting);
                    self.emit("Generating Report...".to_string());
                    let outcome = build_report(&ReportRequest::for_run(&self.params));
                    match &outcome {
                        Ok(summary) => self.emit(format!("REPORT: {summary}")),
                        Err(e) => self.emit(format!("REPORT: {e}")),
                    }
                    report.report = Some(outcome.map_err(|e| e.to_string()));
                }
            }
            Err(e) => {
                error!("Inventory {} unusable: {e}", self.params.inventory().display());
                self.emit(format!("CRITICAL: {e}"));
                report.abort_reason = Some(e.to_string());
            }
        }

        if let Some(mut tunnel) = tunnel {
            tunnel.close().await;
        }

        self.transition(RunState::Done);
        report.state = RunState::Done;
        self.emit("--- DONE ---".to_string());
        report
    }

    fn wants_report(&self) -> bool {
        self.params.auto_report() && matches!(self.params.task(), TaskSource::Command(_))
    }

    async fn process_row(&self, row: &InventoryRow, tunnel: Option<&mut B::Tunnel>) -> RowOutcome {
        let Some(host) = row.host() else {
            debug!("Skipping inventory row without ip/host ({} fields)", row.len());
            return RowOutcome::Blank;
        };
        let identity = host.to_string();

        let port = match row.port() {
            Ok(port) => port,
            Err(e) => return self.fail(identity, RowStage::Resolving, e.to_string()),
        };

        let (address, port) = match tunnel {
            Some(tunnel) => {
                self.emit(format!("Tunneling to {host}..."));
                match tunnel.forward(host, port).await {
                    Ok(local) => (LOOPBACK.to_string(), local),
                    Err(e) => return self.fail(identity, RowStage::Tunneling, e.to_string()),
                }
            }
            None => (host.to_string(), port),
        };

        self.emit(format!("Processing {host}..."));
        let target = DeviceTarget {
            identity,
            platform: resolve_platform(row.device_type(), self.params.vendor()),
            address,
            port,
            credential: self.params.credential().clone(),
        };

        match (self.params.protocol(), self.params.task()) {
            (Protocol::Ssh, TaskSource::Command(command)) => {
                let format = self.params.format();
                match retrieve_ssh(&self.backend, &target, command, format).await {
                    Ok(output) => self.persist(target.identity, &output, format).await,
                    Err(e) => self.fail(target.identity, RowStage::Dispatching, e.to_string()),
                }
            }
            (Protocol::Ssh, TaskSource::Template(path)) => {
                let result = match template::render(path, row) {
                    Ok(config) => push_ssh(&self.backend, &target, &config).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(output) => {
                        debug!("{}: device output:\n{output}", target.identity);
                        self.emit("  > SUCCESS".to_string());
                        RowOutcome::Pushed {
                            identity: target.identity,
                            output,
                        }
                    }
                    Err(e) => self.fail(target.identity, RowStage::Dispatching, e.to_string()),
                }
            }
            (Protocol::Netconf, TaskSource::Template(path)) => {
                let result = match template::render(path, row) {
                    Ok(payload) => push_netconf(&self.backend, &target, &payload).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(reply) => {
                        debug!("{}: rpc-reply:\n{reply}", target.identity);
                        self.emit("  > NETCONF: OK".to_string());
                        RowOutcome::Pushed {
                            identity: target.identity,
                            output: reply,
                        }
                    }
                    Err(e) => self.fail(target.identity, RowStage::Dispatching, e.to_string()),
                }
            }
            (Protocol::Netconf, TaskSource::Command(_)) => self.fail(
                target.identity,
                RowStage::Dispatching,
                "NETCONF runs support push mode only".to_string(),
            ),
        }
    }

    async fn persist(&self, identity: String, output: &str, format: OutputFormat) -> RowOutcome {
        let dir = self.params.results_dir();
        let path = dir.join(artifact_name(&identity, format));

        let written = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => tokio::fs::write(&path, output).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            return self.fail(
                identity,
                RowStage::Persisting,
                format!("{}: {e}", path.display()),
            );
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.emit(format!("  > SAVED: {file_name}"));
        RowOutcome::Saved { identity, path }
    }

    fn fail(&self, identity: String, stage: RowStage, reason: String) -> RowOutcome {
        warn!("{identity}: failed while {stage}: {reason}");
        self.emit(format!("  > FAIL: {reason}"));
        RowOutcome::Failed {
            identity,
            stage,
            reason,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state {} -> {next}", self.state);
        self.state = next;
    }

    fn emit(&self, line: String) {
        self.progress.line(&line);
    }
}

/// Platform for a row: its own `device_type`, else the run's vendor, else
/// [`DEFAULT_PLATFORM`]. Vendor display names map to platform names.
pub fn resolve_platform(device_type: Option<&str>, vendor: Option<&str>) -> String {
    if let Some(device_type) = device_type {
        return platform_for_vendor(device_type)
            .unwrap_or(device_type)
            .to_string();
    }

    match vendor {
        Some(vendor) => match platform_for_vendor(vendor) {
            Some(platform) => platform.to_string(),
            None => {
                warn!("Unknown vendor '{vendor}', using {DEFAULT_PLATFORM}");
                DEFAULT_PLATFORM.to_string()
            }
        },
        None => DEFAULT_PLATFORM.to_string(),
    }
}

fn artifact_name(identity: &str, format: OutputFormat) -> PathBuf {
    let stem = identity.replace(['/', '\\'], "_");
    PathBuf::from(format!("{stem}.{}", format.extension()))
}
