//! Programmer selection command

use std::sync::Arc;

use anyhow::{Context, Result};

use super::{build_orchestrator, spawn_progress_logger};
use crate::cli::args::{Cli, FileArgs};
use crate::cli::host::TerminalHost;
use crate::config::Preferences;
use crate::models::Action;
use crate::project::ProjectConfigFile;
use crate::project::programmer::{PROGRAMMERS, find_programmer};
use crate::utils::logging::ProgressReporter;

/// List the programmers, or persist `id` and apply it to an initialized project
pub async fn execute_programmer_command(
    cli: &Cli,
    id: Option<&str>,
    target: &FileArgs,
) -> Result<()> {
    let config = cli.app_config();

    let Some(id) = id else {
        let preferences = Preferences::load(config.preferences_path())?;
        let current = preferences.programmer();
        for programmer in PROGRAMMERS {
            let marker = if current.as_deref() == Some(programmer.id) { '*' } else { ' ' };
            println!("{} {:<14} {}", marker, programmer.id, programmer.description);
        }
        return Ok(());
    };

    let choice = match id {
        "none" => None,
        id => Some(
            find_programmer(id)
                .map(|p| p.id)
                .with_context(|| format!("Unknown programmer: {}", id))?,
        ),
    };

    let Some(path) = &target.file else {
        let preferences = Preferences::load(config.preferences_path())?;
        preferences.set_programmer(choice)?;
        log::info!("✅ Programmer set to {}", id);
        return Ok(());
    };

    let host = Arc::new(
        TerminalHost::for_path(path, false)
            .with_context(|| format!("Cannot read {}", path.display()))?,
    );
    let (reporter, rx) = ProgressReporter::channel();
    let log_handler = spawn_progress_logger(rx);
    let orchestrator = build_orchestrator(&config, host, reporter)?;

    let result = tokio::task::spawn_blocking(move || -> Result<bool> {
        orchestrator.preferences().set_programmer(choice)?;
        let Ok(session) = orchestrator.load_session(Action::Upload) else {
            return Ok(false);
        };
        let project = ProjectConfigFile::load(session.config_file_path())?;
        if !project.has_environment(session.environment()) {
            return Ok(false);
        }
        orchestrator.programmer(&session, choice)?;
        Ok(true)
    })
    .await?;
    log_handler.await?;

    if result? {
        log::info!("✅ Programmer {} applied to {}", id, path.display());
    } else {
        log::info!("✅ Programmer set to {}, applied on the next upload", id);
    }
    Ok(())
}
