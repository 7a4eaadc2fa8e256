//! CLI command implementations

pub mod action;
pub mod boards;
pub mod programmer;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::cli::args::{Cli, Commands};
use crate::config::{AppConfig, Preferences};
use crate::models::{Action, ProgressEvent};
use crate::orchestrator::{Collaborators, Host, Orchestrator};
use crate::ports::{PortResolver, PortScanner, SystemScanner};
use crate::process::PioRunner;
use crate::utils::logging::{EventReceiver, ProgressReporter};

/// Execute a CLI command
pub async fn execute_command(command: Commands, cli: &Cli) -> Result<()> {
    match command {
        Commands::Init(target) => action::execute_action_command(cli, Action::Init, &target).await,
        Commands::Build(target) => {
            action::execute_action_command(cli, Action::Build, &target).await
        }
        Commands::Upload(target) => {
            action::execute_action_command(cli, Action::Upload, &target).await
        }
        Commands::Clean(target) => {
            action::execute_action_command(cli, Action::Clean, &target).await
        }
        Commands::SelectPort => action::execute_select_port_command(cli).await,
        Commands::ListBoards { filter } => {
            boards::execute_list_boards_command(cli, filter.as_deref()).await
        }
        Commands::RefreshBoards => boards::execute_refresh_boards_command(cli).await,
        Commands::Programmer { id, target } => {
            programmer::execute_programmer_command(cli, id.as_deref(), &target).await
        }
    }
}

/// Wire the orchestrator to the system scanner, `pio` and the saved preferences
pub(crate) fn build_orchestrator(
    config: &AppConfig,
    host: Arc<dyn Host>,
    reporter: ProgressReporter,
) -> Result<Arc<Orchestrator>> {
    let preferences = Preferences::load(config.preferences_path()).with_context(|| {
        format!(
            "Failed to load preferences from {}",
            config.preferences_path().display()
        )
    })?;
    let scanner: Arc<dyn PortScanner> = Arc::new(SystemScanner::new(&config.discovery));

    Ok(Orchestrator::new(
        Collaborators {
            host,
            preferences: Arc::new(preferences),
            runner: Arc::new(PioRunner::new(config.pio_executable.clone())),
            ports: Arc::new(PortResolver::new(scanner, config.port_cache_path())),
            reporter,
        },
        config.clone(),
    ))
}

/// Print tool output as it arrives; everything else is already logged.
///
/// Ends once every reporter clone is dropped.
pub(crate) fn spawn_progress_logger(mut rx: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Output(line) => println!("{}", line),
                ProgressEvent::Started(label) => log::debug!("▶ {}", label),
                _ => {}
            }
        }
    })
}
