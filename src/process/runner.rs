//! Synchronous invocation of the PlatformIO CLI

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::errors::{PioBrewError, Result};
use crate::utils::logging::ProgressReporter;

/// Lines of output kept in a failure report
pub const FAILURE_TAIL_LINES: usize = 20;

/// Result of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    /// Captured stdout followed by stderr
    pub output: Vec<String>,
}

impl RunOutcome {
    pub fn tail(&self) -> Vec<String> {
        let start = self.output.len().saturating_sub(FAILURE_TAIL_LINES);
        self.output[start..].to_vec()
    }
}

/// Runs one external command to completion, streaming its output
pub trait ProcessRunner: Send + Sync {
    /// Run `args` in `cwd`; `Err` only when the command could not be started
    fn run(&self, cwd: &Path, args: &[String], reporter: &ProgressReporter) -> Result<RunOutcome>;

    /// Name shown in messages
    fn display_name(&self) -> String {
        "pio".to_string()
    }
}

/// Run a command and turn a non-zero exit into [`PioBrewError::ProcessFailure`]
pub fn run_checked(
    runner: &dyn ProcessRunner,
    cwd: &Path,
    args: &[String],
    reporter: &ProgressReporter,
) -> Result<RunOutcome> {
    let outcome = runner.run(cwd, args, reporter)?;
    if outcome.success {
        Ok(outcome)
    } else {
        Err(PioBrewError::ProcessFailure {
            command: command_line(&runner.display_name(), args),
            output_tail: outcome.tail(),
        })
    }
}

pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build an argument vector from string literals
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// [`ProcessRunner`] backed by the `pio` executable
#[derive(Debug, Clone)]
pub struct PioRunner {
    executable: PathBuf,
}

impl PioRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl ProcessRunner for PioRunner {
    fn run(&self, cwd: &Path, args: &[String], reporter: &ProgressReporter) -> Result<RunOutcome> {
        let display = command_line(&self.display_name(), args);
        log::info!("🔨 Executing: {} (in {})", display, cwd.display());

        let mut child = Command::new(&self.executable)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PioBrewError::ProcessSpawn(format!("{}: {}", display, e)))?;

        let stderr = child.stderr.take();
        let stderr_reporter = reporter.clone();
        let stderr_reader = std::thread::spawn(move || {
            let mut lines = Vec::new();
            if let Some(stderr) = stderr {
                for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                    stderr_reporter.output(line.clone());
                    lines.push(line);
                }
            }
            lines
        });

        let mut output = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                reporter.output(line.clone());
                output.push(line);
            }
        }

        let status = child.wait()?;
        match stderr_reader.join() {
            Ok(lines) => output.extend(lines),
            Err(_) => log::warn!("stderr reader for {} panicked", display),
        }

        log::debug!("{} exited with {}", display, status);
        Ok(RunOutcome {
            success: status.success(),
            output,
        })
    }

    fn display_name(&self) -> String {
        self.executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pio".to_string())
    }
}
