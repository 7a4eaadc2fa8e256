//! Worker threads for actions and discovery

use std::thread::{self, JoinHandle};

use crate::errors::{PioBrewError, Result};
use crate::utils::logging::ProgressReporter;

/// Runs units of work on named threads and reports start/finish
#[derive(Debug, Clone)]
pub struct BackgroundExecutor {
    reporter: ProgressReporter,
}

impl BackgroundExecutor {
    pub fn new(reporter: ProgressReporter) -> Self {
        Self { reporter }
    }

    /// Start `work` and return immediately; the thread yields its success flag
    pub fn spawn<F>(&self, label: &str, work: F) -> Result<JoinHandle<bool>>
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        let reporter = self.reporter.clone();
        let label = label.to_string();
        thread::Builder::new()
            .name(format!("piobrew-{}", label))
            .spawn(move || {
                reporter.started(&label);
                let success = work();
                reporter.finished(&label, success);
                success
            })
            .map_err(|e| PioBrewError::Worker(e.to_string()))
    }

    /// Run `work` on a worker thread and block until it returns
    pub fn run_blocking<T, F>(&self, label: &str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let reporter = self.reporter.clone();
        let name = label.to_string();
        let handle = thread::Builder::new()
            .name(format!("piobrew-{}", label))
            .spawn(move || {
                reporter.started(&name);
                let value = work();
                reporter.finished(&name, true);
                value
            })
            .map_err(|e| PioBrewError::Worker(e.to_string()))?;

        handle
            .join()
            .map_err(|_| PioBrewError::Worker(format!("{} worker panicked", label)))
    }
}
