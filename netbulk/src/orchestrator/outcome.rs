//! Run states and per-row results.

use std::fmt;
use std::path::PathBuf;

use crate::report::ReportSummary;

/// Run lifecycle.
///
/// `Idle → JumpConnecting → ProcessingRows → Reporting → Done`, with the
/// jump and report steps only when configured. `Failed` is reached only
/// when the jump host cannot be connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    JumpConnecting,
    ProcessingRows,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::JumpConnecting => "connecting jump host",
            Self::ProcessingRows => "processing rows",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Step of the per-row pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStage {
    Resolving,
    Tunneling,
    Dispatching,
    Persisting,
}

impl fmt::Display for RowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Tunneling => "tunneling",
            Self::Dispatching => "dispatching",
            Self::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Result of one inventory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Retrieved output written to `path`.
    Saved { identity: String, path: PathBuf },

    /// Configuration applied; `output` is the device's response.
    Pushed { identity: String, output: String },

    /// Row had no reachability field.
    Blank,

    Failed {
        identity: String,
        stage: RowStage,
        reason: String,
    },
}

impl RowOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { identity, path } => write!(f, "{identity}: saved {}", path.display()),
            Self::Pushed { identity, .. } => write!(f, "{identity}: pushed"),
            Self::Blank => write!(f, "blank row"),
            Self::Failed {
                identity,
                stage,
                reason,
            } => write!(f, "{identity}: failed while {stage}: {reason}"),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub state: RunState,
    pub rows: Vec<RowOutcome>,

    /// Report outcome, when a report was requested. The error side is the
    /// reporting status message.
    pub report: Option<Result<ReportSummary, String>>,

    /// Why the run stopped before processing rows.
    pub abort_reason: Option<String>,
}

impl BatchReport {
    /// Run reached `Done` without aborting. Row and report failures do
    /// not count against it.
    pub fn is_success(&self) -> bool {
        self.state == RunState::Done && self.abort_reason.is_none()
    }

    pub fn saved(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Saved { .. }))
            .count()
    }

    pub fn pushed(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Pushed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|row| row.is_failure()).count()
    }

    pub fn blank(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, RowOutcome::Blank))
            .count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run {}: {} saved, {} pushed, {} failed, {} blank",
            self.state,
            self.saved(),
            self.pushed(),
            self.failed(),
            self.blank()
        )?;
        if let Some(reason) = &self.abort_reason {
            write!(f, " (aborted: {reason})")?;
        }
        match &self.report {
            Some(Ok(summary)) => write!(f, "; report: {summary}")?,
            Some(Err(message)) => write!(f, "; report: {message}")?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_report_counts_and_display() {
        let report = BatchReport {
            state: RunState::Done,
            rows: vec![
                RowOutcome::Saved {
                    identity: "10.0.0.1".into(),
                    path: PathBuf::from("results/10.0.0.1.json"),
                },
                RowOutcome::Blank,
                RowOutcome::Failed {
                    identity: "10.0.0.2".into(),
                    stage: RowStage::Dispatching,
                    reason: "Authentication failed".into(),
                },
            ],
            report: Some(Err("No data extracted.".into())),
            abort_reason: None,
        };

        assert!(report.is_success());
        assert_eq!(report.saved(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.to_string(),
            "Run done: 1 saved, 0 pushed, 1 failed, 1 blank; report: No data extracted."
        );
    }

    #[test]
    fn test_failed_and_aborted_runs() {
        let failed = BatchReport {
            state: RunState::Failed,
            abort_reason: Some("Authentication failed for user 'ops'".into()),
            ..Default::default()
        };
        assert!(!failed.is_success());

        let aborted = BatchReport {
            state: RunState::Done,
            abort_reason: Some("inventory missing".into()),
            ..Default::default()
        };
        assert!(!aborted.is_success());
        assert!(aborted.to_string().ends_with("(aborted: inventory missing)"));
    }

    #[test]
    fn test_row_outcome_display() {
        let row = RowOutcome::Failed {
            identity: "r1".into(),
            stage: RowStage::Tunneling,
            reason: "refused".into(),
        };
        assert_eq!(row.to_string(), "r1: failed while tunneling: refused");
    }
}
