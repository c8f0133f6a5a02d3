//! Progress line sinks.

use tokio::sync::mpsc;

/// Log target used by [`LogProgress`].
pub const PROGRESS_TARGET: &str = "netbulk::progress";

/// Receives human-readable progress lines as a run advances.
pub trait ProgressSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Forwards progress to `log::info!` under [`PROGRESS_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn line(&self, line: &str) {
        log::info!(target: PROGRESS_TARGET, "{line}");
    }
}

/// Lines go to a front-end over a channel. A dropped receiver is ignored.
impl ProgressSink for mpsc::UnboundedSender<String> {
    fn line(&self, line: &str) {
        let _ = self.send(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.line("Processing 10.0.0.1...");
        assert_eq!(rx.try_recv().unwrap(), "Processing 10.0.0.1...");

        drop(rx);
        tx.line("ignored");
    }
}
