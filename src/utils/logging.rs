//! Logging initialization and the user-facing progress reporter

use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;
use tokio::sync::mpsc;

use crate::models::{Action, ProgressEvent};

/// Initialize logging for the piobrew CLI
pub fn init_cli_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = level_for(verbose, quiet);

    Builder::from_default_env()
        .target(Target::Stderr)
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .try_init()?;

    // Initialize panic logging
    #[cfg(debug_assertions)]
    log_panics::init();

    log::debug!("piobrew logging initialized with level: {:?}", level);
    Ok(())
}

fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

pub type EventSender = mpsc::UnboundedSender<ProgressEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Progress sink shared by the orchestrator, its worker threads and the runner.
///
/// Every message is logged and forwarded to the host as a [`ProgressEvent`].
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: EventSender,
}

impl ProgressReporter {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    /// Reporter plus the receiving end of its stream
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: ProgressEvent) {
        if let Err(e) = self.tx.send(event) {
            log::trace!("Progress receiver dropped: {}", e);
        }
    }

    pub fn error(&self, message: String) {
        log::error!("{}", message);
        self.send(ProgressEvent::Error(message));
    }

    pub fn warning(&self, message: String) {
        log::warn!("{}", message);
        self.send(ProgressEvent::Warning(message));
    }

    pub fn info(&self, message: String) {
        log::info!("{}", message);
        self.send(ProgressEvent::Info(message));
    }

    /// One line of external tool output
    pub fn output(&self, line: String) {
        log::debug!("{}", line);
        self.send(ProgressEvent::Output(line));
    }

    pub fn started(&self, label: &str) {
        log::debug!("{} started", label);
        self.send(ProgressEvent::Started(label.to_string()));
    }

    pub fn finished(&self, label: &str, success: bool) {
        log::debug!("{} finished (success: {})", label, success);
        self.send(ProgressEvent::Finished(label.to_string(), success));
    }

    pub fn action_finished(&self, action: Action, success: bool) {
        if success {
            log::info!("{} done", action);
        } else {
            log::error!("{} failed", action);
        }
        self.send(ProgressEvent::ActionFinished(action, success));
    }
}

/// Macro for easy progress logging with format strings
#[macro_export]
macro_rules! progress {
    ($reporter:expr, error, $($arg:tt)*) => {
        $reporter.error(format!($($arg)*))
    };
    ($reporter:expr, warning, $($arg:tt)*) => {
        $reporter.warning(format!($($arg)*))
    };
    ($reporter:expr, info, $($arg:tt)*) => {
        $reporter.info(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reporter_sends_events() {
        let (reporter, mut rx) = ProgressReporter::channel();

        reporter.error("test error".to_string());
        progress!(reporter, warning, "test {}", "warning");
        reporter.info("test info".to_string());

        match rx.recv().await {
            Some(ProgressEvent::Error(msg)) => assert_eq!(msg, "test error"),
            other => panic!("Expected Error event, got: {:?}", other),
        }

        match rx.recv().await {
            Some(ProgressEvent::Warning(msg)) => assert_eq!(msg, "test warning"),
            other => panic!("Expected Warning event, got: {:?}", other),
        }

        match rx.recv().await {
            Some(ProgressEvent::Info(msg)) => assert_eq!(msg, "test info"),
            other => panic!("Expected Info event, got: {:?}", other),
        }
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.info("nobody listens".to_string());
    }

    #[test]
    fn test_log_level_selection() {
        assert_eq!(level_for(0, true), LevelFilter::Error);
        assert_eq!(level_for(0, false), LevelFilter::Info);
        assert_eq!(level_for(1, false), LevelFilter::Debug);
        assert_eq!(level_for(2, false), LevelFilter::Trace);
    }
}
