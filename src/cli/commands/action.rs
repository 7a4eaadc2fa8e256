//! Init, build, upload and clean commands, plus port selection

use std::sync::Arc;

use anyhow::{Context, Result};

use super::{build_orchestrator, spawn_progress_logger};
use crate::cli::args::{Cli, FileArgs};
use crate::cli::host::TerminalHost;
use crate::models::Action;
use crate::orchestrator::FlowState;
use crate::utils::logging::ProgressReporter;

pub async fn execute_action_command(cli: &Cli, action: Action, target: &FileArgs) -> Result<()> {
    let config = cli.app_config();
    let host = Arc::new(open_host(target, !cli.yes)?);

    let (reporter, rx) = ProgressReporter::channel();
    let log_handler = spawn_progress_logger(rx);
    let orchestrator = build_orchestrator(&config, host.clone(), reporter)?;

    log::info!("🔨 piobrew {}", action);

    // Prompts block on stdin, keep them off the async workers
    let (state, success) = tokio::task::spawn_blocking(move || {
        orchestrator.run(action);
        let success = orchestrator.wait();
        (orchestrator.last_state(), success)
    })
    .await?;

    log_handler.await?;

    if let Some(path) = host.current_path() {
        log::debug!("Active file: {}", path.display());
    }
    action_result(action, state, success)
}

pub async fn execute_select_port_command(cli: &Cli) -> Result<()> {
    let config = cli.app_config();
    let host = Arc::new(TerminalHost::prompts_only(!cli.yes));

    let (reporter, rx) = ProgressReporter::channel();
    let log_handler = spawn_progress_logger(rx);
    let orchestrator = build_orchestrator(&config, host, reporter)?;

    log::info!("🔍 Scanning serial ports and network boards...");
    let (before, after) = tokio::task::spawn_blocking(move || {
        let before = orchestrator.preferences().port();
        orchestrator.select_port();
        (before, orchestrator.preferences().port())
    })
    .await?;

    log_handler.await?;

    match after {
        Some(port) if after != before => {
            log::info!("✅ Port set to {}", port);
            Ok(())
        }
        Some(port) => {
            log::info!("Port unchanged: {}", port);
            Ok(())
        }
        None => Err(anyhow::anyhow!("No port selected")),
    }
}

fn open_host(target: &FileArgs, interactive: bool) -> Result<TerminalHost> {
    match &target.file {
        Some(path) => TerminalHost::for_path(path, interactive)
            .with_context(|| format!("Cannot read {}", path.display())),
        None => {
            log::info!("Reading the sketch from stdin");
            TerminalHost::for_stdin_buffer().context("Cannot read the sketch from stdin")
        }
    }
}

/// Map the final flow state and the action result to the exit status
pub fn action_result(
    action: Action,
    state: Option<FlowState>,
    success: Option<bool>,
) -> Result<()> {
    match state {
        Some(FlowState::Started(_)) if success == Some(true) => {
            log::info!("✅ {} completed", action);
            Ok(())
        }
        Some(FlowState::Started(_)) => Err(anyhow::anyhow!("{} failed", action)),
        Some(FlowState::Ignored) => Ok(()),
        Some(FlowState::Rejected) => Err(anyhow::anyhow!("The file cannot be processed")),
        Some(FlowState::Suspended(precondition)) => Err(anyhow::anyhow!(
            "{} cancelled: no {} selected",
            action,
            format!("{:?}", precondition).to_lowercase()
        )),
        Some(FlowState::Busy) => Err(anyhow::anyhow!("Another action is still running")),
        Some(FlowState::Aborted) | None => Err(anyhow::anyhow!("{} aborted", action)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Precondition;

    #[test]
    fn test_action_result_mapping() {
        let started = Some(FlowState::Started(Action::Build));
        assert!(action_result(Action::Build, started, Some(true)).is_ok());
        assert!(action_result(Action::Build, started, Some(false)).is_err());
        assert!(action_result(Action::Build, Some(FlowState::Ignored), None).is_ok());

        let err = action_result(
            Action::Upload,
            Some(FlowState::Suspended(Precondition::Port)),
            None,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "upload cancelled: no port selected");
    }
}
